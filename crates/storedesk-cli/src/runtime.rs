// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::sync::mpsc::Sender;
use std::thread;
use storedesk_api::Client;
use storedesk_app::{FetchRequest, FetchResponse, ListItem, LookupSource, PurchaseInvoicePayload};
use storedesk_testkit::DemoCatalog;
use storedesk_tui::{InternalEvent, SelectorTarget};
use tracing::warn;

/// Talks to the store API. Page fetches run on their own thread so a slow
/// server never blocks typing.
pub struct ApiRuntime {
    client: Client,
}

impl ApiRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl storedesk_tui::AppRuntime for ApiRuntime {
    fn fetch_page(
        &mut self,
        source: LookupSource,
        page: u32,
        search: &str,
    ) -> Result<Vec<ListItem>> {
        self.client.fetch_lookup(source, page, search)
    }

    fn save_purchase_invoice(&mut self, payload: &PurchaseInvoicePayload) -> Result<String> {
        let receipt = self.client.save_purchase_invoice(payload)?;
        Ok(receipt.summary())
    }

    fn spawn_fetch(
        &mut self,
        target: SelectorTarget,
        request: FetchRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("fetch-{}", target.source().as_str()))
            .spawn(move || {
                let result = client
                    .fetch_lookup(target.source(), request.page, &request.search)
                    .map_err(|error| format!("{error:#}"));
                let event = InternalEvent::Fetched {
                    target,
                    response: FetchResponse {
                        request_id: request.id,
                        result,
                    },
                };
                if tx.send(event).is_err() {
                    warn!(request = %request.id, "fetch finished after the ui exited");
                }
            })
            .map_err(|error| anyhow!("start fetch thread: {error}"))?;
        Ok(())
    }
}

/// Serves generated masters from memory for `--demo`.
pub struct DemoRuntime {
    catalog: DemoCatalog,
    saved: usize,
}

impl DemoRuntime {
    pub fn new(catalog: DemoCatalog) -> Self {
        Self { catalog, saved: 0 }
    }
}

impl storedesk_tui::AppRuntime for DemoRuntime {
    fn fetch_page(
        &mut self,
        source: LookupSource,
        page: u32,
        search: &str,
    ) -> Result<Vec<ListItem>> {
        self.catalog.page(source, page, search)
    }

    fn save_purchase_invoice(&mut self, payload: &PurchaseInvoicePayload) -> Result<String> {
        self.saved += 1;
        Ok(format!(
            "saved invoice {} (demo, {} lines, not sent)",
            payload.invoice_no,
            payload.rows.len()
        ))
    }
}
