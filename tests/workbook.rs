use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rusty_tables::Config;
use rusty_tables::RustyTablesError;
use rusty_tables::Value;
use rusty_tables::WorkbookModel;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<workbookPr/>
<sheets><sheet name="cover" sheetId="1" r:id="rId1"/><sheet name="sheet_a" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;

const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="164" formatCode="mmm\-yy"/></numFmts>
<cellXfs count="2"><xf numFmtId="0" fontId="0"/><xf numFmtId="164" fontId="0" applyNumberFormat="1"/></cellXfs>
</styleSheet>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
<si><t>unit food held</t></si>
<si><t>help slowly crowd</t></si>
<si><t>Total</t></si>
</sst>"#;

const COVER: &str = r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Cover</t></is></c></row></sheetData></worksheet>"#;

fn text(reference: &str, value: &str) -> String {
    format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, reference, value)
}

fn shared(reference: &str, index: usize) -> String {
    format!(r#"<c r="{}" t="s"><v>{}</v></c>"#, reference, index)
}

fn number(reference: &str, value: &str) -> String {
    format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value)
}

fn month(reference: &str, serial: u32) -> String {
    format!(r#"<c r="{}" s="1"><v>{}</v></c>"#, reference, serial)
}

fn row(index: usize, cells: &[String]) -> String {
    format!(r#"<row r="{}">{}</row>"#, index, cells.concat())
}

fn sheet_a() -> String {
    let rows = [
        row(1, &[text("A1", "Input report")]),
        row(3, &[text("B3", "test_table_marker")]),
        row(
            4,
            &[
                text("B4", "Key A"),
                text("C4", "Key B"),
                text("D4", "Value A"),
                text("E4", "Value B"),
                month("F4", 43466),
                month("G4", 43497),
                text("H4", "sep"),
                text("I4", "Comment"),
            ],
        ),
        row(
            5,
            &[
                shared("B5", 0),
                text("C5", "Africa neighbor French"),
                number("D5", "79.82"),
                text("E5", "So 1 (QP)"),
                number("G5", "66.47"),
                text("I5", "ignored"),
            ],
        ),
        row(
            6,
            &[
                shared("B6", 1),
                text("C6", "Jamaica move uncle"),
                number("D6", "10"),
                text("E6", "Tab/2"),
                number("F6", "5"),
                number("G6", "1.5"),
            ],
        ),
        row(7, &[shared("B7", 0), shared("C7", 2), number("D7", "89.82"), number("F7", "5"), number("G7", "67.97")]),
        row(9, &[shared("B9", 1), text("C9", "after the blank row"), number("D9", "1000")]),
        row(11, &[text("B11", "join_table_marker")]),
        row(12, &[text("B12", "Key A"), text("C12", "Key B"), text("D12", "Key C"), text("E12", "Detail A")]),
        row(13, &[shared("B13", 0), text("C13", "x"), text("D13", "y"), number("E13", "3")]),
        row(14, &[shared("B14", 0), text("C14", "x"), shared("D14", 2), number("E14", "3")]),
        row(15, &[shared("B15", 1), text("C15", "z"), text("D15", "w"), number("E15", "4")]),
    ];
    format!("<worksheet><sheetData>{}</sheetData></worksheet>", rows.concat())
}

fn write_workbook(path: &Path) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    let sheet = sheet_a();
    for (name, content) in [
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
        ("xl/styles.xml", STYLES),
        ("xl/sharedStrings.xml", SHARED_STRINGS),
        ("xl/worksheets/sheet1.xml", COVER),
        ("xl/worksheets/sheet2.xml", sheet.as_str()),
    ] {
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

const MODEL: &str = "
name: InputBook
name_pattern: book_?.xlsx
tables:
  - name: test_table
    worksheet: sheet_a
    marker: test_table_marker
    key_fields: [key_a, key_b]
    normalize_fields: [value_b]
    filters:
      key_b: Total
  - name: join_table
    worksheet: sheet_a
    marker: join_table_marker
    key_fields: [key_a]
    filters:
      key_b: Total
      key_c: Total
";

fn decimal(value: &str) -> Value {
    Value::Number(value.parse::<Decimal>().unwrap())
}

fn setup() -> (tempfile::TempDir, Config) {
    let directory = tempfile::tempdir().unwrap();
    File::create(directory.path().join("book_a.xlsx"))
        .unwrap()
        .write_all(b"an older export that is not a workbook")
        .unwrap();
    write_workbook(&directory.path().join("book_b.xlsx"));
    let config = Config::from_yaml_str(&format!("directories:\n  InputBook: {}\n", directory.path().display())).unwrap();
    (directory, config)
}

#[test]
fn load_tables_from_latest_workbook() {
    let (directory, config) = setup();
    let model = WorkbookModel::from_yaml_str(MODEL).unwrap();
    let workbook = model.load(&config).unwrap();
    assert_eq!(workbook.path(), directory.path().join("book_b.xlsx"));
    assert_eq!(workbook.tables().keys().collect::<Vec<_>>(), vec!["join_table", "test_table"]);

    let table = workbook.table("test_table").unwrap();
    assert_eq!(table.fields(), ["key_a", "key_b", "value_a", "value_b", "jan_19", "feb_19"]);
    assert_eq!(table.len(), 2);
    let first = &table[0];
    assert_eq!(first["key_a"], Value::from("unit food held"));
    assert_eq!(first["key_b"], Value::from("Africa neighbor French"));
    assert_eq!(first["value_a"], decimal("79.82"));
    assert_eq!(first["value_b"], Value::from("so_1_qp"));
    assert_eq!(first["jan_19"], Value::Null);
    assert_eq!(first["feb_19"], decimal("66.47"));
    assert_eq!(table[1]["value_b"], Value::from("tab_per_2"));

    let grand_total = table.grand_total();
    assert_eq!(grand_total.schema().name(), "test_table_grand_total");
    assert_eq!(grand_total.fields(), ["value_a", "jan_19", "feb_19"]);
    assert_eq!(grand_total.values(), [decimal("89.82"), decimal("5"), decimal("67.97")]);

    let extent = table.extent().unwrap();
    assert_eq!((extent.start_row, extent.start_col, extent.stop_col), (3, 1, 7));
    assert_eq!(table.source().unwrap().marker, "test_table_marker");
}

#[test]
fn join_table_filters_every_rule() {
    let (_directory, config) = setup();
    let workbook = WorkbookModel::from_yaml_str(MODEL).unwrap().load(&config).unwrap();
    let table = workbook.table("join_table").unwrap();
    assert_eq!(table.fields(), ["key_a", "key_b", "key_c", "detail_a"]);
    assert_eq!(table.len(), 2);
    assert!(table.iter().all(|record| record["key_c"] != Value::from("Total")));
    assert_eq!(table.grand_total().fields(), ["detail_a"]);
    assert_eq!(table.grand_total()["detail_a"], Value::from(7));
}

#[test]
fn aggregate_and_index_loaded_table() {
    let (_directory, config) = setup();
    let workbook = WorkbookModel::from_yaml_str(MODEL).unwrap().load(&config).unwrap();
    let table = workbook.table("test_table").unwrap();

    let summed = table.sum_by(&["key_a"]).unwrap();
    assert_eq!(summed.name(), "test_table_by_key_a");
    assert_eq!(summed.fields(), ["key_a", "value_a", "jan_19", "feb_19"]);
    let keys: Vec<&Value> = summed.iter().map(|record| &record["key_a"]).collect();
    assert_eq!(keys, vec![&Value::from("help slowly crowd"), &Value::from("unit food held")]);
    assert_eq!(summed.grand_total().values(), table.grand_total().values());

    let index = table.make_index(&["key_a"]).unwrap();
    assert_eq!(index.len(), 2);
    let record = table
        .by_key(&[Value::from("help slowly crowd"), Value::from("Jamaica move uncle")])
        .unwrap();
    assert_eq!(record["value_a"], Value::from(10));
}

#[test]
fn missing_marker_names_workbook_and_table() {
    let (_directory, config) = setup();
    let model = WorkbookModel::from_yaml_str(
        "
name: InputBook
name_pattern: book_b.xlsx
tables:
  - name: other_table
    worksheet: cover
    marker: other_marker
",
    )
    .unwrap();
    let error = model.load(&config).unwrap_err();
    assert!(matches!(error, RustyTablesError::WithContextError(_)));
    let message = error.to_string();
    assert!(message.contains("book_b.xlsx"), "{}", message);
    assert!(message.contains("other_table"), "{}", message);
    assert!(message.ends_with("Marker 'other_marker' not found in sheet 'cover'"), "{}", message);
}
