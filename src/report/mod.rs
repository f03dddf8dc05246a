// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Downloadable artifacts built from the displayed results.

mod csv_export;
mod pdf;

pub use csv_export::build_csv;
pub use pdf::build_report;

/// File name for a download, e.g. `busqueda_soil_carbon.pdf`.
pub fn download_name(topic: &str, extension: &str) -> String {
    let slug: String = topic
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let slug = slug.trim_matches('_');
    let slug = if slug.is_empty() { "results" } else { slug };
    format!("busqueda_{slug}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_names_are_filesystem_safe() {
        assert_eq!(download_name("soil carbon", "pdf"), "busqueda_soil_carbon.pdf");
        assert_eq!(download_name("a/b\\c\"", "csv"), "busqueda_a_b_c.csv");
        assert_eq!(download_name("  ", "csv"), "busqueda_results.csv");
    }
}
