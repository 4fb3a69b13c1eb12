//! Invoice data extracted by the LLM backend.
//!
//! Column names match the keys the extraction prompt asks the model for, and
//! double as the header rows of the exported workbook.

use serde_json::Value;

/// Header sheet columns, in output order.
pub const INVOICE_COLUMNS: [&str; 12] = [
    "szamlaszam",
    "vevo_neve",
    "szallito_neve",
    "vevo_adoszam",
    "szallito_adoszam",
    "teljesites_datuma",
    "szamla_keltee",
    "fizetesi_hatarido",
    "brutto_osszeg",
    "netto_osszeg",
    "afa_osszeg",
    "devizanem",
];

/// Item sheet columns, in output order. The first column keys each line item
/// to its parent invoice by value.
pub const ITEM_COLUMNS: [&str; 6] = [
    "szamlaszam",
    "megnevezes",
    "netto",
    "afa",
    "afakulcs",
    "brutto",
];

/// One extracted invoice header. All fields are free-form text; anything the
/// model could not resolve is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceRecord {
    pub szamlaszam: String,
    pub vevo_neve: String,
    pub szallito_neve: String,
    pub vevo_adoszam: String,
    pub szallito_adoszam: String,
    pub teljesites_datuma: String,
    pub szamla_keltee: String,
    pub fizetesi_hatarido: String,
    pub brutto_osszeg: String,
    pub netto_osszeg: String,
    pub afa_osszeg: String,
    pub devizanem: String,
}

impl InvoiceRecord {
    /// Flatten into a sheet row, one cell per `INVOICE_COLUMNS` entry.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.szamlaszam.clone(),
            self.vevo_neve.clone(),
            self.szallito_neve.clone(),
            self.vevo_adoszam.clone(),
            self.szallito_adoszam.clone(),
            self.teljesites_datuma.clone(),
            self.szamla_keltee.clone(),
            self.fizetesi_hatarido.clone(),
            self.brutto_osszeg.clone(),
            self.netto_osszeg.clone(),
            self.afa_osszeg.clone(),
            self.devizanem.clone(),
        ]
    }
}

/// One invoice line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItem {
    pub megnevezes: String,
    pub netto: String,
    pub afa: String,
    pub afakulcs: String,
    pub brutto: String,
}

/// One invoice plus its line items; the unit the LLM adapter produces per
/// uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedInvoice {
    pub record: InvoiceRecord,
    pub items: Vec<LineItem>,
}

impl ExtractedInvoice {
    /// Build from the model's parsed JSON object. Absent keys default to empty
    /// strings; scalar values of any JSON type are coerced to text, since the
    /// model is not guaranteed to quote numbers despite the prompt.
    pub fn from_json(data: &Value) -> Self {
        let record = InvoiceRecord {
            szamlaszam: field_text(data, "szamlaszam"),
            vevo_neve: field_text(data, "vevo_neve"),
            szallito_neve: field_text(data, "szallito_neve"),
            vevo_adoszam: field_text(data, "vevo_adoszam"),
            szallito_adoszam: field_text(data, "szallito_adoszam"),
            teljesites_datuma: field_text(data, "teljesites_datuma"),
            szamla_keltee: field_text(data, "szamla_keltee"),
            fizetesi_hatarido: field_text(data, "fizetesi_hatarido"),
            brutto_osszeg: field_text(data, "brutto_osszeg"),
            netto_osszeg: field_text(data, "netto_osszeg"),
            afa_osszeg: field_text(data, "afa_osszeg"),
            devizanem: field_text(data, "devizanem"),
        };

        let items = data
            .get("tetelek")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| LineItem {
                        megnevezes: field_text(entry, "megnevezes"),
                        netto: field_text(entry, "netto"),
                        afa: field_text(entry, "afa"),
                        afakulcs: field_text(entry, "afakulcs"),
                        brutto: field_text(entry, "brutto"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        ExtractedInvoice { record, items }
    }
}

/// Read a scalar JSON field as text. Missing keys and nulls become `""`.
pub fn field_text(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_fields_default_to_empty_string() {
        let data = json!({ "szamlaszam": "INV-1" });
        let extracted = ExtractedInvoice::from_json(&data);

        assert_eq!(extracted.record.szamlaszam, "INV-1");
        assert_eq!(extracted.record.vevo_neve, "");
        assert_eq!(extracted.record.devizanem, "");
        assert!(extracted.items.is_empty());
    }

    #[test]
    fn numeric_values_are_coerced_to_text() {
        let data = json!({
            "szamlaszam": "INV-2",
            "brutto_osszeg": 5730.88,
            "netto_osszeg": 4512,
            "tetelek": [{ "megnevezes": "item", "netto": 4512, "afakulcs": "27%" }]
        });
        let extracted = ExtractedInvoice::from_json(&data);

        assert_eq!(extracted.record.brutto_osszeg, "5730.88");
        assert_eq!(extracted.record.netto_osszeg, "4512");
        assert_eq!(extracted.items.len(), 1);
        assert_eq!(extracted.items[0].netto, "4512");
        assert_eq!(extracted.items[0].afa, "");
    }

    #[test]
    fn row_order_matches_declared_columns() {
        let record = InvoiceRecord {
            szamlaszam: "A".into(),
            devizanem: "HUF".into(),
            ..Default::default()
        };
        let row = record.to_row();

        assert_eq!(row.len(), INVOICE_COLUMNS.len());
        assert_eq!(row[0], "A");
        assert_eq!(row[11], "HUF");
    }

    #[test]
    fn null_item_array_yields_no_items() {
        let data = json!({ "szamlaszam": "INV-3", "tetelek": null });
        let extracted = ExtractedInvoice::from_json(&data);
        assert!(extracted.items.is_empty());
    }
}
