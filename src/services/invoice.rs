//! Paid invoice document attached to a settled payment.

use chrono::{DateTime, NaiveDate, Utc};

pub const CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug, Clone)]
pub struct Invoice {
    pub number: String,
    pub description: String,
    pub amount: i64,
    pub payment_method: String,
    pub bank: String,
    pub va_number: String,
    pub paid_at: DateTime<Utc>,
}

/// `INV/{date}/ORD/{payment id, zero padded to 6}`.
pub fn invoice_number(payment_id: i32, date: NaiveDate) -> String {
    format!("INV/{}/ORD/{:06}", date.format("%Y-%m-%d"), payment_id)
}

/// Storage object name for an invoice number.
pub fn file_name(number: &str) -> String {
    format!("{}.html", number.replace('/', "-").to_lowercase())
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub fn render(invoice: &Invoice) -> String {
    let total = invoice.amount;
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{number}</title>
<style>
body {{ font-family: Helvetica, Arial, sans-serif; color: #222; margin: 40px; }}
h1 {{ font-size: 20px; margin-bottom: 4px; }}
table {{ width: 100%; border-collapse: collapse; margin-top: 24px; }}
th, td {{ text-align: left; padding: 8px; border-bottom: 1px solid #ddd; }}
.paid {{ color: #1a7f37; font-weight: bold; }}
.total {{ font-weight: bold; }}
</style>
</head>
<body>
<h1>Invoice</h1>
<p>{number}</p>
<p class="paid">PAID</p>
<table>
<tr><th>Payment method</th><td>{method}</td></tr>
<tr><th>Bank</th><td>{bank}</td></tr>
<tr><th>VA number</th><td>{va}</td></tr>
<tr><th>Paid at</th><td>{date}</td></tr>
</table>
<table>
<tr><th>Description</th><th>Amount</th></tr>
<tr><td>{description}</td><td>{total}</td></tr>
<tr class="total"><td>Total</td><td>{total}</td></tr>
</table>
</body>
</html>
"#,
        number = escape(&invoice.number),
        method = escape(&invoice.payment_method),
        bank = escape(&invoice.bank.to_uppercase()),
        va = escape(&invoice.va_number),
        date = invoice.paid_at.format("%Y-%m-%d"),
        description = escape(&invoice.description),
        total = total,
    )
}
