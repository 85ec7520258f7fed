// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{PurchaseInvoice, SudoMap, parse_number};

/// Rejects sudo codes containing letters outside the configured alphabet.
///
/// The calculator itself silently drops such letters; this check runs when
/// the clerk leaves the code cell so a typo is caught before it skews the
/// sale rate.
pub fn validate_sudo_letters(code: &str, sudo: &SudoMap) -> Result<()> {
    let unknown = sudo.unknown_letters(code.trim());
    if unknown.is_empty() {
        return Ok(());
    }
    let letters = unknown.iter().collect::<String>();
    let alphabet = sudo.letters().iter().collect::<String>();
    bail!("sudo code {code:?} has unknown letters {letters:?} -- use only {alphabet:?}");
}

impl PurchaseInvoice {
    pub fn validate(&self, sudo: &SudoMap) -> Result<()> {
        if self.supplier.is_none() {
            bail!("supplier is required -- press enter on the supplier field to choose one");
        }
        if self.invoice_no.trim().is_empty() {
            bail!("invoice number is required -- enter the supplier's bill number and retry");
        }

        let mut filled = 0_usize;
        for (index, row) in self.rows.iter().enumerate() {
            if row.is_blank() {
                continue;
            }
            filled += 1;
            let line = index + 1;
            if row.item_code.trim().is_empty() {
                bail!("line {line} has no item -- press enter on the item cell to choose one");
            }
            if parse_number(&row.qty) <= 0.0 {
                bail!("line {line} quantity must be positive");
            }
            if parse_number(&row.purchase_rate) < 0.0 {
                bail!("line {line} purchase rate cannot be negative");
            }
            if parse_number(&row.override_weight) < 0.0 {
                bail!("line {line} weight cannot be negative");
            }
            if let Err(error) = validate_sudo_letters(&row.sudo_code, sudo) {
                bail!("line {line}: {error}");
            }
        }

        if filled == 0 {
            bail!("invoice has no lines -- add at least one item and retry");
        }
        Ok(())
    }
}
