use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::error::{InvoiceError, Result};
use crate::invoice::InvoiceDocument;

/// Embedded Typst template for invoice rendering.
/// Uses a placeholder that gets replaced with the actual JSON file path
const INVOICE_TEMPLATE: &str = r##"// Invoice Template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "a4",
  margin: (top: 40pt, bottom: 60pt, left: 40pt, right: 40pt),
  footer: align(center, text(size: 10pt, fill: rgb("#666666"))[Thank you for your business!]),
)

#set text(font: "Helvetica", size: 10pt, fill: rgb("#333333"))

#let fmt-int(digits) = {
  let len = digits.len()
  let out = ""
  for (i, digit) in digits.clusters().enumerate() {
    if i > 0 and calc.rem(len - i, 3) == 0 {
      out += ","
    }
    out += digit
  }
  out
}

#let fmt-currency(amount) = {
  let parts = str(calc.round(amount, digits: 2)).split(".")
  let whole = fmt-int(parts.at(0))
  let frac = if parts.len() > 1 { parts.at(1) } else { "00" }
  let frac2 = if frac.len() == 1 { frac + "0" } else { frac }
  data.currency_symbol + whole + "." + frac2
}

#let line-or-skip(label, value) = if value != none and value != "" [#label#value \ ]

// Header
#text(size: 32pt, weight: "bold", fill: rgb("#111111"))[INVOICE]
#v(-0.6em)
#text(size: 14pt, fill: rgb("#666666"))[#data.number]

#v(1.5em)

#grid(
  columns: (1fr, 1fr),
  align: (left, right),
  [
    #text(size: 16pt, weight: "bold")[#data.company.name]
    #v(0.3em)
    #line-or-skip("", data.company.address)
    #line-or-skip("Tax ID: ", data.company.tax_id)
    #line-or-skip("Phone: ", data.company.phone)
    #line-or-skip("Email: ", data.company.email)
  ],
  [
    #table(
      columns: (auto, auto),
      stroke: none,
      align: (right, left),
      inset: 2pt,
      [*Issued:*], [#data.issue_date],
      ..if data.due_date != none { ([*Due:*], [#data.due_date]) } else { () },
      [*Status:*], [#data.status],
    )
  ]
)

#v(1.5em)

// Bill To section
#text(weight: "bold", size: 12pt, fill: rgb("#111111"))[BILL TO]
#v(0.3em)
#text(weight: "bold")[#data.client.name] \
#line-or-skip("", data.client.address)
#line-or-skip("Phone: ", data.client.phone)
#line-or-skip("Email: ", data.client.email)

#v(1.5em)

// Line items table
#table(
  columns: (1fr, auto, auto, auto, auto, auto),
  align: (left, right, right, right, right, right),
  stroke: (x, y) => (bottom: 1pt + rgb("#EEEEEE")),
  inset: 8pt,

  [*Description*], [*Qty*], [*Price*], [*Tax*], [*Discount*], [*Amount*],

  ..data.items.map(item => (
    item.description,
    str(item.quantity),
    fmt-currency(item.unit_price),
    str(item.tax_rate) + "%",
    str(item.discount_rate) + "%",
    fmt-currency(item.amount),
  )).flatten()
)

#v(1em)

// Totals
#align(right)[
  #table(
    columns: (100pt, 100pt),
    stroke: none,
    align: (right, right),
    inset: 4pt,

    [*Subtotal:*], [*#fmt-currency(data.subtotal)*],
    [*Tax:*], [*#fmt-currency(data.tax_total)*],
    [*Discount:*], [*-#fmt-currency(data.discount_total)*],
    table.hline(stroke: 1pt + rgb("#EEEEEE")),
    [#text(size: 14pt)[*Total:*]], [#text(size: 14pt)[*#fmt-currency(data.total)*]],
  )
]

#v(2em)

#if data.payment_terms != "" [
  #text(weight: "bold")[Payment Terms:] #data.payment_terms
  #v(0.5em)
]

#if data.notes != "" [
  #text(weight: "bold")[Notes] \
  #data.notes
  #v(0.5em)
]

#if data.terms != "" [
  #text(weight: "bold")[Terms & Conditions] \
  #data.terms
]
"##;

/// Render an invoice to PDF using the Typst CLI
pub fn generate_pdf(document: &InvoiceDocument, output_path: &Path) -> Result<()> {
    // Check if typst is available
    if Command::new("typst").arg("--version").output().is_err() {
        return Err(InvoiceError::TypstNotFound);
    }

    // One temp directory per invoice number
    let temp_dir = std::env::temp_dir()
        .join("invoicetree")
        .join(document.number.replace(['/', '\\'], "-"));
    std::fs::create_dir_all(&temp_dir)?;

    let json_data = serde_json::to_string(document)
        .map_err(|e| InvoiceError::PdfGeneration(e.to_string()))?;
    let json_path = temp_dir.join("data.json");
    std::fs::write(&json_path, &json_data)?;

    // Template reads data.json relative to the temp root
    let template_content = INVOICE_TEMPLATE.replace("DATA_JSON_PATH", "data.json");
    let template_path = temp_dir.join("invoice.typ");
    std::fs::write(&template_path, &template_content)?;

    debug!(output = %output_path.display(), "running typst compile");
    let output = Command::new("typst")
        .arg("compile")
        .arg("--root")
        .arg(&temp_dir)
        .arg(&template_path)
        .arg(output_path)
        .output()?;

    // Clean up temp files
    let _ = std::fs::remove_dir_all(&temp_dir);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(InvoiceError::PdfGeneration(stderr.to_string()));
    }

    Ok(())
}
