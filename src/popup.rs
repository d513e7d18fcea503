//! Popup and summary text shown for a record on the map.

use crate::models::PropertyRecord;
use serde::Serialize;

const NO_NAME: &str = "Casa sin nombre";
const NO_OWNER: &str = "Sin propietario";
const NO_STREET: &str = "Sin calle";
const PLACEHOLDER: &str = "-";
const NO_PAYMENTS: &str = "No hay datos";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentLine {
    pub year: i32,
    pub paid: bool,
    pub amount: f64,
}

impl PaymentLine {
    pub fn label(&self) -> String {
        let status = if self.paid { "✅ Pagado" } else { "❌ Pendiente" };
        format!("{}: {} ({})", self.year, status, self.amount)
    }
}

/// Display fields of a marker popup, with placeholders already applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupContent {
    pub title: String,
    pub owner: String,
    pub address: String,
    pub neighborhood: String,
    pub district: String,
    pub assessed_value: String,
    pub annual_tax: String,
    pub payments: Vec<PaymentLine>,
}

impl PopupContent {
    pub fn for_record(record: &PropertyRecord) -> Self {
        let address = &record.details.address;
        let street = or_placeholder(&address.street, NO_STREET);
        let address_line = match address.number.as_deref() {
            Some(number) => format!("{} #{}", street, number),
            None => street,
        };

        Self {
            title: or_placeholder(&record.name, NO_NAME),
            owner: or_placeholder(&record.details.owner, NO_OWNER),
            address: address_line,
            neighborhood: or_placeholder(&address.neighborhood, PLACEHOLDER),
            district: or_placeholder(&address.district, PLACEHOLDER),
            assessed_value: record.details.assessed_value.to_string(),
            annual_tax: record.details.annual_tax.to_string(),
            payments: record
                .payments()
                .iter()
                .map(|p| PaymentLine {
                    year: p.year,
                    paid: p.paid,
                    amount: p.amount,
                })
                .collect(),
        }
    }

    /// Renders the popup as HTML. Every field is escaped.
    pub fn to_html(&self) -> String {
        let payments = if self.payments.is_empty() {
            escape(NO_PAYMENTS)
        } else {
            let items: String = self
                .payments
                .iter()
                .map(|p| format!("<li>{}</li>", escape(&p.label())))
                .collect();
            format!("<ul>{}</ul>", items)
        };

        format!(
            "<b>{}</b><br>\
             <b>Propietario:</b> {}<br>\
             <b>Dirección:</b> {}<br>\
             <b>Barrio:</b> {}<br>\
             <b>Distrito:</b> {}<br>\
             <b>Valor catastral:</b> {}<br>\
             <b>Impuesto anual:</b> {}<br>\
             <b>Pagos:</b>{}",
            escape(&self.title),
            escape(&self.owner),
            escape(&self.address),
            escape(&self.neighborhood),
            escape(&self.district),
            escape(&self.assessed_value),
            escape(&self.annual_tax),
            payments,
        )
    }
}

/// Plain-text listing of search results, one block per record.
pub fn search_summary(records: &[PropertyRecord]) -> String {
    let mut out = format!("Se encontraron {} casa(s):\n", records.len());
    for (i, record) in records.iter().enumerate() {
        let address = &record.details.address;
        let payments = if record.payments().is_empty() {
            NO_PAYMENTS.to_string()
        } else {
            record
                .payments()
                .iter()
                .map(|p| {
                    PaymentLine {
                        year: p.year,
                        paid: p.paid,
                        amount: p.amount,
                    }
                    .label()
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        out.push_str(&format!(
            "\nCasa {}\n\
             • ID: {}\n\
             • Nombre: {}\n\
             • Propietario: {}\n\
             • Dirección: {}, {}, {}, {}\n\
             • Valor catastral: {}\n\
             • Impuesto anual: {}\n\
             • Coordenadas: ({}, {})\n\
             • Pagos:\n{}\n\
             --------------------------\n",
            i + 1,
            record.id,
            or_placeholder(&record.name, PLACEHOLDER),
            or_placeholder(&record.details.owner, PLACEHOLDER),
            or_placeholder(&address.street, PLACEHOLDER),
            address.number.as_deref().unwrap_or(PLACEHOLDER),
            or_placeholder(&address.neighborhood, PLACEHOLDER),
            or_placeholder(&address.district, PLACEHOLDER),
            record.details.assessed_value,
            record.details.annual_tax,
            record.details.latitude,
            record.details.longitude,
            payments,
        ));
    }
    out
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

fn escape(text: &str) -> String {
    ammonia::clean_text(text)
}
