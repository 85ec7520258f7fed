// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Serialize;
use time::Date;

use crate::{
    ListItem, RowInputs, RowKey, RowOutputs, SudoMap, calculate_row, format_fixed, parse_number,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowField {
    Item,
    Qty,
    OverrideWeight,
    PurchaseRate,
    AssignedRate,
    InboundTaxPercent,
    WholesaleMarkupPercent,
    SudoCode,
    ManualProfitPercent,
}

impl RowField {
    pub const EDITABLE: [Self; 9] = [
        Self::Item,
        Self::Qty,
        Self::OverrideWeight,
        Self::PurchaseRate,
        Self::AssignedRate,
        Self::InboundTaxPercent,
        Self::WholesaleMarkupPercent,
        Self::SudoCode,
        Self::ManualProfitPercent,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Item => "Item",
            Self::Qty => "Qty",
            Self::OverrideWeight => "Weight",
            Self::PurchaseRate => "P.Rate",
            Self::AssignedRate => "S.Rate",
            Self::InboundTaxPercent => "Tax%",
            Self::WholesaleMarkupPercent => "Wsl%",
            Self::SudoCode => "Code",
            Self::ManualProfitPercent => "Pft%",
        }
    }

    /// Numeric cells accept digits, one decimal point and a leading minus.
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Item | Self::SudoCode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRow {
    pub key: RowKey,
    pub item_code: String,
    pub item_name: String,
    pub qty: String,
    pub override_weight: String,
    pub purchase_rate: String,
    pub assigned_rate: String,
    pub inbound_tax_percent: String,
    pub wholesale_markup_percent: String,
    pub sudo_code: String,
    pub manual_profit_percent: String,
    pub outputs: RowOutputs,
}

impl InvoiceRow {
    pub fn new(key: RowKey) -> Self {
        Self {
            key,
            item_code: String::new(),
            item_name: String::new(),
            qty: String::new(),
            override_weight: String::new(),
            purchase_rate: String::new(),
            assigned_rate: String::new(),
            inbound_tax_percent: String::new(),
            wholesale_markup_percent: String::new(),
            sudo_code: String::new(),
            manual_profit_percent: String::new(),
            outputs: RowOutputs::default(),
        }
    }

    pub fn inputs(&self) -> RowInputs {
        RowInputs {
            qty: parse_number(&self.qty),
            override_weight: parse_number(&self.override_weight),
            purchase_rate: parse_number(&self.purchase_rate),
            assigned_rate: parse_number(&self.assigned_rate),
            inbound_tax_percent: parse_number(&self.inbound_tax_percent),
            wholesale_markup_percent: parse_number(&self.wholesale_markup_percent),
            sudo_code: self.sudo_code.trim().to_owned(),
            manual_profit_percent: parse_number(&self.manual_profit_percent),
        }
    }

    pub fn recalculate(&mut self, sudo: &SudoMap) {
        self.outputs = calculate_row(&self.inputs(), sudo);
    }

    pub fn field(&self, field: RowField) -> &str {
        match field {
            RowField::Item => &self.item_code,
            RowField::Qty => &self.qty,
            RowField::OverrideWeight => &self.override_weight,
            RowField::PurchaseRate => &self.purchase_rate,
            RowField::AssignedRate => &self.assigned_rate,
            RowField::InboundTaxPercent => &self.inbound_tax_percent,
            RowField::WholesaleMarkupPercent => &self.wholesale_markup_percent,
            RowField::SudoCode => &self.sudo_code,
            RowField::ManualProfitPercent => &self.manual_profit_percent,
        }
    }

    pub fn field_mut(&mut self, field: RowField) -> &mut String {
        match field {
            RowField::Item => &mut self.item_code,
            RowField::Qty => &mut self.qty,
            RowField::OverrideWeight => &mut self.override_weight,
            RowField::PurchaseRate => &mut self.purchase_rate,
            RowField::AssignedRate => &mut self.assigned_rate,
            RowField::InboundTaxPercent => &mut self.inbound_tax_percent,
            RowField::WholesaleMarkupPercent => &mut self.wholesale_markup_percent,
            RowField::SudoCode => &mut self.sudo_code,
            RowField::ManualProfitPercent => &mut self.manual_profit_percent,
        }
    }

    /// Copies identity and the rates an item record carries into the row.
    pub fn apply_item(&mut self, item: &ListItem) {
        self.item_code = item.field("code").to_owned();
        self.item_name = item.field("name").to_owned();
        if let Some(rate) = item.get("purchase_rate").filter(|rate| !rate.is_empty()) {
            self.purchase_rate = rate.to_owned();
        }
        if let Some(rate) = item.get("sale_rate").filter(|rate| !rate.is_empty()) {
            self.assigned_rate = rate.to_owned();
        }
        if self.qty.trim().is_empty() {
            self.qty = "1".to_owned();
        }
    }

    /// Prefilled defaults such as the tax percentage do not count as input.
    pub fn is_blank(&self) -> bool {
        [
            RowField::Item,
            RowField::Qty,
            RowField::OverrideWeight,
            RowField::PurchaseRate,
        ]
        .iter()
        .all(|field| self.field(*field).trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceTotals {
    pub line_count: usize,
    pub qty: f64,
    pub amount: f64,
}

impl InvoiceTotals {
    pub fn qty_text(&self) -> String {
        format_fixed(self.qty)
    }

    pub fn amount_text(&self) -> String {
        format_fixed(self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseInvoice {
    pub supplier: Option<ListItem>,
    pub invoice_no: String,
    pub date: Date,
    pub rows: Vec<InvoiceRow>,
    default_tax_percent: String,
    next_key: RowKey,
}

impl PurchaseInvoice {
    pub fn new(date: Date, default_tax_percent: f64) -> Self {
        let mut invoice = Self {
            supplier: None,
            invoice_no: String::new(),
            date,
            rows: Vec::new(),
            default_tax_percent: if default_tax_percent == 0.0 {
                String::new()
            } else {
                format!("{default_tax_percent}")
            },
            next_key: RowKey::new(1),
        };
        invoice.push_row();
        invoice
    }

    /// Appends a blank row and returns its index.
    pub fn push_row(&mut self) -> usize {
        let mut row = InvoiceRow::new(self.next_key);
        row.inbound_tax_percent = self.default_tax_percent.clone();
        self.next_key = self.next_key.next();
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Removes a row; the grid always keeps one row to type into.
    pub fn remove_row(&mut self, index: usize) -> Option<InvoiceRow> {
        if index >= self.rows.len() {
            return None;
        }
        let removed = self.rows.remove(index);
        if self.rows.is_empty() {
            self.push_row();
        }
        Some(removed)
    }

    pub fn recalculate_all(&mut self, sudo: &SudoMap) {
        for row in &mut self.rows {
            row.recalculate(sudo);
        }
    }

    pub fn filled_rows(&self) -> impl Iterator<Item = &InvoiceRow> {
        self.rows.iter().filter(|row| !row.is_blank())
    }

    pub fn totals(&self) -> InvoiceTotals {
        self.filled_rows().fold(
            InvoiceTotals {
                line_count: 0,
                qty: 0.0,
                amount: 0.0,
            },
            |mut totals, row| {
                totals.line_count += 1;
                totals.qty += parse_number(&row.qty);
                totals.amount += parse_number(&row.outputs.amount);
                totals
            },
        )
    }

    pub fn payload(&self) -> PurchaseInvoicePayload {
        let totals = self.totals();
        PurchaseInvoicePayload {
            supplier_code: self
                .supplier
                .as_ref()
                .map(|supplier| supplier.field("code").to_owned())
                .unwrap_or_default(),
            supplier_name: self
                .supplier
                .as_ref()
                .map(|supplier| supplier.field("name").to_owned())
                .unwrap_or_default(),
            invoice_no: self.invoice_no.trim().to_owned(),
            invoice_date: self.date.to_string(),
            rows: self
                .filled_rows()
                .map(|row| {
                    let inputs = row.inputs();
                    PayloadRow {
                        item_code: row.item_code.clone(),
                        item_name: row.item_name.clone(),
                        qty: inputs.qty,
                        override_weight: inputs.override_weight,
                        purchase_rate: inputs.purchase_rate,
                        assigned_rate: inputs.assigned_rate,
                        inbound_tax_percent: inputs.inbound_tax_percent,
                        wholesale_markup_percent: inputs.wholesale_markup_percent,
                        sudo_code: inputs.sudo_code,
                        outputs: row.outputs.clone(),
                    }
                })
                .collect(),
            total_qty: totals.qty_text(),
            total_amount: totals.amount_text(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseInvoicePayload {
    pub supplier_code: String,
    pub supplier_name: String,
    pub invoice_no: String,
    pub invoice_date: String,
    pub rows: Vec<PayloadRow>,
    pub total_qty: String,
    pub total_amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadRow {
    pub item_code: String,
    pub item_name: String,
    pub qty: f64,
    pub override_weight: f64,
    pub purchase_rate: f64,
    pub assigned_rate: f64,
    pub inbound_tax_percent: f64,
    pub wholesale_markup_percent: f64,
    pub sudo_code: String,
    #[serde(flatten)]
    pub outputs: RowOutputs,
}
