use crate::error::RustyTablesError;
use crate::helpers::xml::match_xml_events;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::records::value::Value;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

// XML tag names of the workbook parts
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt"); // Custom number format
const TAG_CELL_FORMATS: QName = QName(b"cellXfs"); // Cell format container
const TAG_CELL_FORMAT: QName = QName(b"xf"); // Cell format, indexed by the `s` attribute of cells
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// An Office Open XML workbook (`.xlsx`, `.xlsm`, `.xlam`)
pub(crate) struct XlsxSpreadsheet<RS: Read + Seek> {
    /// File name of the spreadsheet
    name: String,
    zip: ZipArchive<RS>,
    /// Cell types indexed by style ID
    number_formats: Vec<CellType>,
    /// Worksheets as (name, zip_path) pairs, in workbook order
    sheets: Vec<(String, String)>,
    /// Loaded on first sheet read
    shared_strings: Option<Vec<String>>,
}

impl XlsxSpreadsheet<BufReader<File>> {
    /// Opens a workbook file and reads its sheet list and number formats.
    pub(crate) fn open(path: &Path) -> Result<Self, RustyTablesError> {
        let file = File::open(path)?;
        XlsxSpreadsheet::from_reader(&path.to_string_lossy(), BufReader::new(file))
    }
}

impl<RS: Read + Seek> XlsxSpreadsheet<RS> {
    /// Reads a workbook from any seekable source.
    ///
    /// # Arguments
    /// * `name` - Name used in errors and log messages
    /// * `reader` - The ZIP container of the workbook
    pub(crate) fn from_reader(name: &str, reader: RS) -> Result<Self, RustyTablesError> {
        let mut zip = ZipArchive::new(reader).map_err(|_| SpreadsheetError::FileFormatError(name.to_owned()))?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?;
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        debug!("{}: {} sheets, 1904 date system: {}", name, sheets.len(), is_1904);
        Ok(XlsxSpreadsheet {
            name: name.to_owned(),
            zip,
            number_formats,
            sheets,
            shared_strings: None,
        })
    }
}

impl<RS: Read + Seek> Spreadsheet for XlsxSpreadsheet<RS> {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, RustyTablesError> {
        let zip_path = self
            .sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, zip_path)| zip_path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFoundError(self.name.to_owned(), sheet_name.to_owned()))?;
        if self.shared_strings.is_none() {
            self.shared_strings = Some(load_shared_strings(&mut self.zip)?);
        }

        let shared_strings = self.shared_strings.as_deref().unwrap_or(&[]);
        let mut sheet = Sheet::new(&self.name, sheet_name);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut reader = self
            .zip
            .xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(index) = event.parse_attribute_value::<usize>("r")? {
                    row_count = index.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => row_count += 1,
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event
                    .get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                kind = match event.get_attribute_value("t")?.as_deref() {
                    Some("inlineStr") | Some("str") => CellType::InlineString,
                    Some("s") => CellType::SharedString,
                    Some("d") => CellType::IsoDateTime,
                    Some("b") => CellType::Boolean,
                    Some("e") => CellType::Error,
                    _ => CellType::Number,
                };
                if kind == CellType::Number {
                    if let Some(style) = event.parse_attribute_value::<usize>("s")? {
                        kind = self.number_formats.get(style).copied().unwrap_or(CellType::Number);
                    }
                }
                value.clear();
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = reader.read_text(TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = reader.read_text(TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if !value.is_empty() {
                    let cell_value = if kind == CellType::SharedString {
                        let index = value.trim().parse::<usize>()?;
                        let text = shared_strings.get(index).ok_or(SpreadsheetError::SharedStringError(index))?;
                        Value::Text(text.to_owned())
                    } else {
                        kind.to_value(&value).map_err(|message| {
                            SpreadsheetError::CellValueError(
                                self.name.to_owned(),
                                sheet_name.to_owned(),
                                index_to_reference(row, col),
                                message,
                            )
                        })?
                    };
                    sheet.push(Cell { row, col, value: cell_value });
                }
                value.clear();
            }
        });
        debug!("{}: read sheet '{}' with {} rows", self.name, sheet_name, sheet.row_count());
        Ok(sheet)
    }
}

/// Reads sheet names and their part paths from `xl/workbook.xml`, and whether
/// the workbook uses the 1904 date system.
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), RustyTablesError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_owned()))?;
    let mut sheets = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None;
            let mut id = None;
            for attribute in event.attributes() {
                let attribute = attribute?;
                match attribute.key.local_name().as_ref() {
                    b"name" => name = Some(attribute.unescape_value()?.to_string()),
                    b"id" => id = Some(attribute.unescape_value()?.to_string()),
                    _ => (),
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id) {
                    sheets.push((name, path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event
                .get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Maps relationship IDs to worksheet part paths.
fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, String>, RustyTablesError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
    let mut relationships = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|kind| kind.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves a relationship target against the `xl/` folder.
fn to_zip_path(target: &str) -> String {
    if let Some(path) = target.strip_prefix('/') {
        path.to_owned()
    } else if target.starts_with("xl/") {
        target.to_owned()
    } else {
        format!("xl/{}", target)
    }
}

/// Resolves the cell type of every cell format in `xl/styles.xml`.
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>, is_1904: bool) -> Result<Vec<CellType>, RustyTablesError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_ids = Vec::<String>::new();
    let mut is_cell_formats = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_CELL_FORMATS => is_cell_formats = true,
        Event::End(event) if event.name() == TAG_CELL_FORMATS => break,
        Event::Start(event) if is_cell_formats && event.name() == TAG_CELL_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            format_ids.push(id.map(|id| id.to_string()).unwrap_or_default());
        }
    });

    let number_formats = format_ids
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect();
    Ok(number_formats)
}

/// Reads every item of the shared string table, phonetic runs excluded.
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, RustyTablesError> {
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };
    let mut shared_strings = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(reader.read_text(TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
        <workbookPr date1904="false"/>
        <sheets><sheet name="sheet_a" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    const RELATIONSHIPS: &str = r#"<Relationships>
        <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
        <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
        </Relationships>"#;
    const STYLES: &str = r#"<styleSheet>
        <numFmts count="1"><numFmt numFmtId="164" formatCode="mmm\-yy"/></numFmts>
        <cellStyleXfs count="1"><xf numFmtId="0"/></cellStyleXfs>
        <cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="14"/></cellXfs>
        </styleSheet>"#;
    const SHARED_STRINGS: &str = r#"<sst><si><t>table_a_marker</t></si><si><r><t>Key</t></r><r><t> 1</t></r></si></sst>"#;
    const SHEET: &str = r#"<worksheet><sheetData>
        <row r="2"><c r="B2" t="s"><v>0</v></c></row>
        <row r="3"><c r="B3" t="s"><v>1</v></c><c r="C3" s="1"><v>43466</v></c><c r="D3" t="inlineStr"><is><t>Note &amp; more</t></is></c></row>
        <row><c t="b"><v>1</v></c><c s="2"/><c><v>1.5E-3</v></c><c t="e"><v>#N/A</v></c></row>
        <row><c><v>1E+30</v></c><c><v>1.7976931348623157E+308</v></c><c><v>1E-30</v></c><c><v>7</v></c></row>
        </sheetData></worksheet>"#;

    fn workbook() -> XlsxSpreadsheet<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in [
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/styles.xml", STYLES),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", SHEET),
        ] {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        let cursor = writer.finish().unwrap();
        XlsxSpreadsheet::from_reader("book_a.xlsx", Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn sheet_names() {
        let workbook = workbook();
        assert_eq!(workbook.name(), "book_a.xlsx");
        assert_eq!(workbook.sheet_names(), vec!["sheet_a"]);
        assert_eq!(workbook.number_formats, vec![CellType::Number, CellType::NumberDate1900, CellType::NumberDate1900]);
    }

    #[test]
    fn read_cells() {
        let mut workbook = workbook();
        let sheet = workbook.read_sheet("sheet_a").unwrap();
        assert_eq!(sheet.row_count(), 5);
        assert_eq!(sheet.value(0, 0), &Value::Null);
        assert_eq!(sheet.value(1, 1), &Value::from("table_a_marker"));
        assert_eq!(sheet.value(2, 1), &Value::from("Key 1"));
        assert_eq!(sheet.value(2, 2), &Value::from(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()));
        assert_eq!(sheet.value(2, 3), &Value::from("Note & more"));
        assert_eq!(sheet.value(3, 0), &Value::from(true));
        assert_eq!(sheet.get(3, 1), None);
        assert_eq!(sheet.value(3, 2), &Value::Number(rust_decimal::Decimal::new(15, 4)));
        assert_eq!(sheet.value(3, 3), &Value::from("#N/A"));
    }

    #[test]
    fn out_of_range_numbers_do_not_fail_the_sheet() {
        let mut workbook = workbook();
        let sheet = workbook.read_sheet("sheet_a").unwrap();
        assert_eq!(sheet.value(4, 0), &Value::from("1E+30"));
        assert_eq!(sheet.value(4, 1), &Value::from("1.7976931348623157E+308"));
        assert_eq!(sheet.value(4, 2), &Value::Number(rust_decimal::Decimal::ZERO));
        assert_eq!(sheet.value(4, 3), &Value::from(7));
    }

    #[test]
    fn missing_sheet() {
        let mut workbook = workbook();
        let error = workbook.read_sheet("nope").unwrap_err();
        assert!(matches!(
            error,
            RustyTablesError::SpreadsheetError(SpreadsheetError::SheetNotFoundError(_, sheet)) if sheet == "nope"
        ));
    }

    #[test]
    fn not_a_zip_file() {
        let result = XlsxSpreadsheet::from_reader("book.xlsx", Cursor::new(b"plain text".to_vec()));
        assert!(matches!(
            result,
            Err(RustyTablesError::SpreadsheetError(SpreadsheetError::FileFormatError(_)))
        ));
    }

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
    }
}
