//! Renders a quotation into the preview document the capture backends read.
//!
//! The output is a complete HTML page whose `#invoice-preview` element holds
//! the printable quotation. Only inline styles are used, so the page renders
//! the same in the built-in layout engine and in a browser.

use crate::invoice::{format_amount, CompanyProfile, Invoice, InvoiceItem};
use std::fmt::Write;

/// Element id of the preview root
pub const PREVIEW_ROOT_ID: &str = "invoice-preview";

/// Height of the elevation diagram placeholder, CSS px
pub const DIAGRAM_HEIGHT_PX: u32 = 160;

/// Escape text for use in element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// `2024-06-01T00:00:00.000Z` -> `2024-06-01`
fn display_date(date: &str) -> &str {
    date.split('T').next().unwrap_or(date)
}

pub fn render_preview_html(invoice: &Invoice, company: &CompanyProfile) -> String {
    let e = escape_html;
    let mut html = String::with_capacity(8 * 1024);

    // Writing into a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Quotation {}</title>\n</head>\n<body style=\"margin: 0\">\n",
        e(&invoice.invoice_number)
    );
    let _ = writeln!(
        html,
        "<div id=\"{}\" style=\"padding: 24px; background: #ffffff\">",
        PREVIEW_ROOT_ID
    );

    render_header(&mut html, invoice, company);
    render_client(&mut html, invoice);
    for (index, item) in invoice.items.iter().enumerate() {
        render_item(&mut html, index, item);
    }
    render_totals(&mut html, invoice);
    render_terms(&mut html, invoice, company);

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn render_header(html: &mut String, invoice: &Invoice, company: &CompanyProfile) {
    let e = escape_html;
    html.push_str("<div style=\"padding: 12px; background: #0f172a; color: #ffffff\">\n");
    let _ = writeln!(html, "<h1>{}</h1>", e(&company.name));
    if !company.address.is_empty() {
        let _ = writeln!(html, "<p>{}</p>", e(&company.address));
    }
    let contact: Vec<String> = [&company.phone, &company.email, &company.website]
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| e(s))
        .collect();
    if !contact.is_empty() {
        let _ = writeln!(html, "<p>{}</p>", contact.join(" | "));
    }
    if let Some(gstin) = &company.gstin {
        let _ = writeln!(html, "<p>GSTIN: {}</p>", e(gstin));
    }
    html.push_str("</div>\n");

    let _ = writeln!(html, "<h2>Quotation {}</h2>", e(&invoice.invoice_number));
    let _ = writeln!(
        html,
        "<table><tr><td>Date: {}</td><td>Prepared by: {}</td><td>Status: {}</td></tr></table>",
        e(display_date(&invoice.date)),
        e(&invoice.prepared_by),
        invoice.status
    );
}

fn render_client(html: &mut String, invoice: &Invoice) {
    let e = escape_html;
    html.push_str("<div style=\"padding: 8px; border: 1px solid #cbd5e1\">\n<h3>Quotation for</h3>\n");
    let _ = writeln!(html, "<p>{}</p>", e(&invoice.client_name));
    if !invoice.client_address.is_empty() {
        let _ = writeln!(html, "<p>{}</p>", e(&invoice.client_address));
    }
    html.push_str("</div>\n");
}

fn render_item(html: &mut String, index: usize, item: &InvoiceItem) {
    let e = escape_html;
    let details = &item.technical_details;
    let position = if item.position.is_empty() {
        format!("{:03}", index + 1)
    } else {
        e(&item.position)
    };

    html.push_str("<div style=\"padding: 8px; border: 1px solid #0f172a\">\n");
    let _ = writeln!(html, "<h3>{} - {}</h3>", position, details.kind);
    if !item.description.is_empty() {
        let _ = writeln!(html, "<p>{}</p>", e(&item.description));
    }
    let _ = writeln!(
        html,
        "<img alt=\"{} elevation {} x {} mm\" height=\"{}\">",
        details.kind, item.width, item.height, DIAGRAM_HEIGHT_PX
    );
    html.push_str("<table>\n<tr><th>System</th><th>Profiles</th><th>Glazing</th><th>Hardware</th><th>Finish</th></tr>\n");
    let _ = writeln!(
        html,
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n</table>",
        e(&details.system),
        e(&details.profiles),
        e(&details.glazing),
        e(&details.hardware),
        e(&details.finish)
    );
    html.push_str("<table>\n<tr><th>Width (mm)</th><th>Height (mm)</th><th>Qty</th><th>Area (sqft)</th><th>Rate/sqft</th><th>Amount</th></tr>\n");
    let _ = writeln!(
        html,
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.3}</td><td>{}</td><td>{}</td></tr>\n</table>",
        item.width,
        item.height,
        item.billed_quantity(),
        item.area_sqft(),
        format_amount(item.price_per_sqft),
        format_amount(item.line_total())
    );
    if let Some(remarks) = item.remarks.as_deref().filter(|r| !r.is_empty()) {
        let _ = writeln!(html, "<p>Remarks: {}</p>", e(remarks));
    }
    html.push_str("</div>\n");
}

fn render_totals(html: &mut String, invoice: &Invoice) {
    let totals = invoice.totals();
    let mut rows: Vec<(String, f64)> = vec![("Subtotal".into(), totals.subtotal)];
    if totals.discount != 0.0 {
        rows.push(("Discount".into(), -totals.discount));
    }
    if invoice.cgst_rate != 0.0 {
        rows.push((format!("CGST ({}%)", invoice.cgst_rate), totals.cgst));
    }
    if invoice.sgst_rate != 0.0 {
        rows.push((format!("SGST ({}%)", invoice.sgst_rate), totals.sgst));
    }
    if invoice.igst_rate != 0.0 {
        rows.push((format!("IGST ({}%)", invoice.igst_rate), totals.igst));
    }
    rows.push(("Freight".into(), totals.freight));

    html.push_str("<table>\n");
    for (label, amount) in rows {
        let _ = writeln!(html, "<tr><td>{}</td><td>{}</td></tr>", label, format_amount(amount));
    }
    let _ = writeln!(
        html,
        "<tr style=\"background: #0f172a; color: #ffffff\"><td>Grand Total</td><td>{}</td></tr>",
        format_amount(totals.grand_total)
    );
    html.push_str("</table>\n");
}

fn render_terms(html: &mut String, invoice: &Invoice, company: &CompanyProfile) {
    let e = escape_html;
    if !invoice.terms_and_conditions.is_empty() {
        html.push_str("<h3>Terms and Conditions</h3>\n<ol>\n");
        for term in &invoice.terms_and_conditions {
            let _ = writeln!(html, "<li>{}</li>", e(term));
        }
        html.push_str("</ol>\n");
    }
    if let Some(notes) = invoice.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(html, "<p>Notes: {}</p>", e(notes));
    }
    if let Some(bank) = &company.bank_details {
        html.push_str("<h3>Bank Details</h3>\n");
        let _ = writeln!(
            html,
            "<table><tr><td>{}</td><td>{}</td><td>IFSC {}</td><td>{}</td></tr></table>",
            e(&bank.account_name),
            e(&bank.account_number),
            e(&bank.ifsc),
            e(&bank.bank_name)
        );
    }
}
