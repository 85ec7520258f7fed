// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Derived fields for one purchase-invoice line.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Letter to digit lookup for sudo codes. A letter's position in the
/// configured alphabet is its digit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SudoMap {
    letters: Vec<char>,
    digits: HashMap<char, usize>,
}

impl SudoMap {
    pub fn new(letters: &str) -> Self {
        Self::from_letters(letters.chars())
    }

    /// Repeated letters keep their first position.
    pub fn from_letters<I>(letters: I) -> Self
    where
        I: IntoIterator<Item = char>,
    {
        let mut map = Self::default();
        for letter in letters {
            if map.digits.contains_key(&letter) {
                continue;
            }
            map.digits.insert(letter, map.letters.len());
            map.letters.push(letter);
        }
        map
    }

    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    pub fn digit_for(&self, letter: char) -> Option<usize> {
        self.digits.get(&letter).copied()
    }

    pub fn contains(&self, letter: char) -> bool {
        self.digits.contains_key(&letter)
    }

    /// Concatenates the digits of every mapped letter in `code`. Unmapped
    /// letters contribute nothing; a code with no mapped letters is 0. Codes
    /// longer than an integer type holds keep their magnitude as `f64`.
    pub fn resolve(&self, code: &str) -> f64 {
        let digits = code
            .chars()
            .filter_map(|letter| self.digit_for(letter))
            .map(|digit| digit.to_string())
            .collect::<String>();
        digits.parse::<f64>().map(finite_or_zero).unwrap_or(0.0)
    }

    pub fn unknown_letters(&self, code: &str) -> Vec<char> {
        let mut unknown = Vec::new();
        for letter in code.chars() {
            if !self.contains(letter) && !unknown.contains(&letter) {
                unknown.push(letter);
            }
        }
        unknown
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowInputs {
    pub qty: f64,
    /// Zero or negative means "not supplied".
    pub override_weight: f64,
    pub purchase_rate: f64,
    pub assigned_rate: f64,
    pub inbound_tax_percent: f64,
    pub wholesale_markup_percent: f64,
    pub sudo_code: String,
    pub manual_profit_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOutputs {
    pub average_weight: String,
    pub actual_cost: String,
    pub net_cost: String,
    pub sale_rate: String,
    pub margin_percent: String,
    pub wholesale_rate: String,
    pub amount: String,
    pub profit_percent: String,
}

pub fn calculate_row(inputs: &RowInputs, sudo: &SudoMap) -> RowOutputs {
    let profit_percent = resolve_profit_percent(
        &inputs.sudo_code,
        inputs.manual_profit_percent,
        sudo,
    );

    let (average_weight, actual_cost, net_cost, base_amount) = if inputs.override_weight > 0.0 {
        let average_weight = if inputs.qty == 0.0 {
            0.0
        } else {
            inputs.override_weight / inputs.qty
        };
        let actual_cost = average_weight * inputs.purchase_rate;
        (
            average_weight,
            actual_cost,
            actual_cost,
            inputs.override_weight * inputs.purchase_rate,
        )
    } else {
        (
            0.0,
            inputs.purchase_rate,
            inputs.purchase_rate,
            inputs.qty * inputs.purchase_rate,
        )
    };

    let amount = base_amount + base_amount * inputs.inbound_tax_percent / 100.0;
    let sale_rate = actual_cost + actual_cost * profit_percent / 100.0;
    let margin_percent = if actual_cost == 0.0 {
        0.0
    } else {
        (inputs.assigned_rate - actual_cost) / actual_cost * 100.0
    };
    let wholesale_rate = net_cost + net_cost * inputs.wholesale_markup_percent / 100.0;

    RowOutputs {
        average_weight: if average_weight == 0.0 {
            String::new()
        } else {
            format_fixed(average_weight)
        },
        actual_cost: format_fixed(actual_cost),
        net_cost: format_fixed(net_cost),
        sale_rate: format_fixed(sale_rate),
        margin_percent: format_fixed(margin_percent),
        wholesale_rate: format_fixed(wholesale_rate),
        amount: format_fixed(amount),
        profit_percent: format_plain(profit_percent),
    }
}

/// A non-empty sudo code wins over the manually typed percentage.
pub fn resolve_profit_percent(sudo_code: &str, manual_profit_percent: f64, sudo: &SudoMap) -> f64 {
    if sudo_code.is_empty() {
        finite_or_zero(manual_profit_percent)
    } else {
        sudo.resolve(sudo_code)
    }
}

/// Lenient numeric parse for form text: blanks, junk and non-finite values
/// become 0.
pub fn parse_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().map(finite_or_zero).unwrap_or(0.0)
}

/// Two decimals, with exact ties rounded away from zero.
pub fn format_fixed(value: f64) -> String {
    let value = finite_or_zero(value);
    // A double ties at the third decimal only on an odd multiple of 1/8;
    // `{:.2}` would round those to even.
    let eighths = value * 8.0;
    let value = if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        value + value.signum() * 0.001
    } else {
        value
    };
    // Adding 0.0 folds -0.0 into 0.0 so "-0.00" never renders.
    format!("{:.2}", value + 0.0)
}

fn format_plain(value: f64) -> String {
    format!("{}", finite_or_zero(value) + 0.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
