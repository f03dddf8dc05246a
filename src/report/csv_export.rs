// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

// CSV export of the full normalised table.

use serde::Serialize;

use crate::error::ReportError;
use crate::normalize::ArticleRecord;

/// Spreadsheet applications need the BOM to detect UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Serialize)]
struct CsvRow<'a> {
    title: &'a str,
    authors: &'a str,
    year: &'a str,
    source: &'a str,
    venue: &'a str,
    objective: &'a str,
    methodology: &'a str,
    keywords: &'a str,
    summary: &'a str,
    url: &'a str,
    doi: &'a str,
}

impl<'a> From<&'a ArticleRecord> for CsvRow<'a> {
    fn from(r: &'a ArticleRecord) -> Self {
        Self {
            title: &r.title,
            authors: &r.authors,
            year: &r.year,
            source: &r.source,
            venue: &r.venue,
            objective: &r.objective,
            methodology: &r.methodology,
            keywords: &r.keywords,
            summary: &r.summary,
            url: &r.url,
            doi: &r.doi,
        }
    }
}

/// UTF-8 (with BOM) CSV with a header row and one row per record.
pub fn build_csv(records: &[ArticleRecord]) -> Result<Vec<u8>, ReportError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(UTF8_BOM.to_vec());

    if records.is_empty() {
        // serialize() writes the header lazily, so emit it by hand.
        wtr.write_record(HEADER)?;
    }
    for record in records {
        wtr.serialize(CsvRow::from(record))?;
    }

    wtr.into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))
}

const HEADER: [&str; 11] = [
    "title",
    "authors",
    "year",
    "source",
    "venue",
    "objective",
    "methodology",
    "keywords",
    "summary",
    "url",
    "doi",
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(bytes: &[u8]) -> (Vec<String>, Vec<csv::StringRecord>) {
        let body = bytes.strip_prefix(UTF8_BOM).expect("BOM present");
        let mut rdr = csv::Reader::from_reader(body);
        let headers = rdr.headers().unwrap().iter().map(String::from).collect();
        let rows = rdr.records().collect::<Result<Vec<_>, _>>().unwrap();
        (headers, rows)
    }

    #[test]
    fn header_plus_one_row_per_record() {
        let mut with_commas = ArticleRecord::with_title("Soil, water and \"carbon\"");
        with_commas.summary = "line one\nline two".into();
        let records = vec![with_commas, ArticleRecord::with_title("B")];

        let (headers, rows) = parse(&build_csv(&records).unwrap());
        assert_eq!(headers, HEADER.map(String::from).to_vec());
        assert_eq!(rows.len(), records.len());
        assert_eq!(&rows[0][0], "Soil, water and \"carbon\"");
        assert_eq!(&rows[0][8], "line one\nline two");
        // Defaults, never blanks standing in for nulls.
        assert_eq!(&rows[1][1], "unspecified");
        assert_eq!(&rows[1][2], "N/A");
    }

    #[test]
    fn empty_table_still_has_header() {
        let (headers, rows) = parse(&build_csv(&[]).unwrap());
        assert_eq!(headers.len(), 11);
        assert!(rows.is_empty());
    }
}
