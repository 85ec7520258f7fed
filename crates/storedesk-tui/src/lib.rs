// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use storedesk_app::{
    AppCommand, AppState, FetchRequest, FetchResponse, InputSuppression, InvoiceRow, ListItem,
    LookupSource, PurchaseInvoice, PurchaseInvoicePayload, RowField, RowKey, Screen,
    SelectorEvent, SelectorFocus, SelectorKey, SelectorState, SudoMap, validate_sudo_letters,
};
use time::Date;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const HEADER_FIELD_COUNT: usize = 3;
const ROW_FIELD_COUNT: usize = RowField::EDITABLE.len();

/// Which form field a selector overlay fills when the user confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorTarget {
    Supplier,
    InvoiceItem(RowKey),
    Lookup(LookupSource),
}

impl SelectorTarget {
    pub const fn source(self) -> LookupSource {
        match self {
            Self::Supplier => LookupSource::Supplier,
            Self::InvoiceItem(_) => LookupSource::Item,
            Self::Lookup(source) => source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Fetched {
        target: SelectorTarget,
        response: FetchResponse,
    },
}

pub trait AppRuntime {
    fn fetch_page(&mut self, source: LookupSource, page: u32, search: &str)
    -> Result<Vec<ListItem>>;

    /// Submits a validated invoice and returns the line to show the clerk.
    fn save_purchase_invoice(&mut self, payload: &PurchaseInvoicePayload) -> Result<String>;

    fn spawn_fetch(
        &mut self,
        target: SelectorTarget,
        request: FetchRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .fetch_page(target.source(), request.page, &request.search)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::Fetched {
            target,
            response: FetchResponse {
                request_id: request.id,
                result,
            },
        })
        .map_err(|_| anyhow::anyhow!("fetch event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiOptions {
    pub sudo: SudoMap,
    pub default_tax_percent: f64,
    pub responsive_breakpoint: u16,
    pub invoice_date: Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InvoiceFocus {
    Supplier,
    InvoiceNo,
    Date,
    Cell { row: usize, field: RowField },
}

#[derive(Debug, Clone)]
struct ViewData {
    options: UiOptions,
    invoice: PurchaseInvoice,
    focus: InvoiceFocus,
    lookup_cursor: usize,
    lookup_detail: Option<(LookupSource, ListItem)>,
    selectors: HashMap<LookupSource, SelectorState>,
    overlay: Option<SelectorTarget>,
    suppression: InputSuppression<KeyCode>,
    terminal_area: Rect,
    status_token: u64,
}

impl ViewData {
    fn new(options: UiOptions) -> Self {
        let invoice = PurchaseInvoice::new(options.invoice_date, options.default_tax_percent);
        Self {
            options,
            invoice,
            focus: InvoiceFocus::Supplier,
            lookup_cursor: 0,
            lookup_detail: None,
            selectors: HashMap::new(),
            overlay: None,
            suppression: InputSuppression::default(),
            terminal_area: Rect::new(0, 0, 120, 40),
            status_token: 0,
        }
    }

    fn active_selector(&self) -> Option<&SelectorState> {
        self.overlay
            .and_then(|target| self.selectors.get(&target.source()))
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: UiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();
    info!("ui started");

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);
        tick(state, runtime, &mut view_data, &internal_tx, Instant::now());

        let drawn = terminal.draw(|frame| {
            view_data.terminal_area = frame.area();
            render(frame, state, &view_data);
        });
        if let Err(error) = drawn {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(POLL_INTERVAL).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(Event::Mouse(mouse)) => {
                    handle_mouse_event(state, runtime, &mut view_data, &internal_tx, mouse);
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(
        io::stdout(),
        DisableMouseCapture,
        terminal::LeaveAlternateScreen
    )
    .context("leave alternate screen")?;
    info!("ui stopped");
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Fetched { target, response } => {
                apply_fetched(state, view_data, tx, target, response);
            }
        }
    }
}

fn apply_fetched(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    target: SelectorTarget,
    response: FetchResponse,
) {
    if view_data.overlay != Some(target) {
        debug!(?target, request = %response.request_id, "dropping fetch for inactive overlay");
        return;
    }
    let Some(selector) = view_data.selectors.get_mut(&target.source()) else {
        return;
    };
    let failure = response.result.as_ref().err().cloned();
    if !selector.apply_fetch(response) {
        return;
    }
    if let Some(error) = failure {
        emit_status(
            state,
            view_data,
            tx,
            format!("could not load {}: {error}", target.source().label()),
        );
    }
}

/// Fires due debounced searches.
fn tick<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    now: Instant,
) {
    let Some(target) = view_data.overlay else {
        return;
    };
    let Some(selector) = view_data.selectors.get_mut(&target.source()) else {
        return;
    };
    let events = selector.poll(now);
    if !events.is_empty() {
        apply_selector_events(state, runtime, view_data, tx, target, events);
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }

    if view_data.suppression.consume(&key.code, Instant::now()) {
        debug!(code = ?key.code, "swallowed key that followed a selector confirm");
        return false;
    }

    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if state.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::F(1)) {
            state.dispatch(AppCommand::ToggleHelp);
            emit_status(state, view_data, internal_tx, "help hidden");
        }
        return false;
    }

    if view_data.overlay.is_some() {
        handle_selector_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::F(1), _) => {
            state.dispatch(AppCommand::ToggleHelp);
            emit_status(state, view_data, internal_tx, "help open");
            return false;
        }
        (KeyCode::F(2), KeyModifiers::NONE) => {
            switch_screen(state, view_data, internal_tx, AppCommand::NextScreen);
            return false;
        }
        (KeyCode::F(2), _) => {
            switch_screen(state, view_data, internal_tx, AppCommand::PrevScreen);
            return false;
        }
        _ => {}
    }

    match state.screen {
        Screen::PurchaseInvoice => handle_invoice_key(state, runtime, view_data, internal_tx, key),
        Screen::Lookups => handle_lookup_key(state, runtime, view_data, internal_tx, key),
    }
    false
}

fn switch_screen(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    if state.screen == Screen::PurchaseInvoice {
        leave_focus(state, view_data, internal_tx);
    }
    state.dispatch(command);
    let label = state.screen.label();
    emit_status(state, view_data, internal_tx, label);
}

fn handle_mouse_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    mouse: MouseEvent,
) {
    let Some(target) = view_data.overlay else {
        return;
    };
    match mouse.kind {
        MouseEventKind::ScrollDown => handle_selector_key(
            state,
            runtime,
            view_data,
            internal_tx,
            KeyEvent::new(KeyCode::Down, KeyModifiers::NONE),
        ),
        MouseEventKind::ScrollUp => handle_selector_key(
            state,
            runtime,
            view_data,
            internal_tx,
            KeyEvent::new(KeyCode::Up, KeyModifiers::NONE),
        ),
        MouseEventKind::Down(MouseButton::Left) => {
            let layout = selector_layout(view_data.terminal_area);
            let Some(selector) = view_data.selectors.get_mut(&target.source()) else {
                return;
            };
            let Some(index) = list_index_at(&layout, selector, mouse.column, mouse.row) else {
                return;
            };
            let events = selector.click(index);
            apply_selector_events(state, runtime, view_data, internal_tx, target, events);
        }
        _ => {}
    }
}

fn handle_selector_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(target) = view_data.overlay else {
        return;
    };
    let selector_key = match key.code {
        KeyCode::Up => SelectorKey::ArrowUp,
        KeyCode::Down => SelectorKey::ArrowDown,
        KeyCode::Enter => SelectorKey::Enter,
        KeyCode::Esc => SelectorKey::Escape,
        KeyCode::Backspace => SelectorKey::Backspace,
        KeyCode::Char(ch) => SelectorKey::Char {
            ch,
            modified: key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT),
        },
        _ => return,
    };

    let Some(selector) = view_data.selectors.get_mut(&target.source()) else {
        view_data.overlay = None;
        return;
    };
    let mut events = selector.handle_key(selector_key, Instant::now());
    if selector_key == SelectorKey::ArrowDown {
        events.extend(scroll_events(selector));
    }

    let confirmed = events
        .iter()
        .any(|event| matches!(event, SelectorEvent::Selected(_)));
    apply_selector_events(state, runtime, view_data, internal_tx, target, events);
    if confirmed && key.code == KeyCode::Enter {
        view_data.suppression.arm(KeyCode::Enter, Instant::now());
    }
}

/// The viewport follows the highlight, so its distance from the last row is
/// the scroll distance from the bottom.
fn scroll_events(selector: &mut SelectorState) -> Vec<SelectorEvent> {
    let Some(highlighted) = selector.highlighted() else {
        return Vec::new();
    };
    let distance = selector.items().len().saturating_sub(highlighted + 1);
    selector.scrolled(distance)
}

fn open_selector<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    target: SelectorTarget,
    initial_search: &str,
) {
    let source = target.source();
    let breakpoint = view_data.options.responsive_breakpoint;
    let selector = view_data
        .selectors
        .entry(source)
        .or_insert_with(|| SelectorState::new(source.selector_config().breakpoint(breakpoint)));
    let events = selector.open(initial_search);
    view_data.overlay = Some(target);
    apply_selector_events(state, runtime, view_data, internal_tx, target, events);
}

fn apply_selector_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    target: SelectorTarget,
    events: Vec<SelectorEvent>,
) {
    for event in events {
        match event {
            SelectorEvent::FetchRequested(request) => {
                if let Err(error) = runtime.spawn_fetch(target, request, internal_tx.clone()) {
                    emit_status(
                        state,
                        view_data,
                        internal_tx,
                        format!("could not load {}: {error:#}", target.source().label()),
                    );
                }
            }
            SelectorEvent::Selected(item) => {
                apply_selection(state, view_data, internal_tx, target, item);
            }
            SelectorEvent::SearchCleared => {}
            SelectorEvent::Closed => view_data.overlay = None,
        }
    }
}

fn apply_selection(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    target: SelectorTarget,
    item: ListItem,
) {
    match target {
        SelectorTarget::Supplier => {
            let name = item.field("name").to_owned();
            view_data.invoice.supplier = Some(item);
            view_data.focus = InvoiceFocus::InvoiceNo;
            emit_status(state, view_data, internal_tx, format!("supplier {name}"));
        }
        SelectorTarget::InvoiceItem(key) => {
            let Some(index) = view_data.invoice.rows.iter().position(|row| row.key == key) else {
                debug!(row = %key, "item chosen for a removed line");
                return;
            };
            let row = &mut view_data.invoice.rows[index];
            row.apply_item(&item);
            row.recalculate(&view_data.options.sudo);
            view_data.focus = InvoiceFocus::Cell {
                row: index,
                field: RowField::Qty,
            };
        }
        SelectorTarget::Lookup(source) => {
            view_data.lookup_detail = Some((source, item));
        }
    }
}

fn handle_invoice_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Char('n'), KeyModifiers::CONTROL) => {
            leave_focus(state, view_data, internal_tx);
            let index = view_data.invoice.push_row();
            view_data.focus = InvoiceFocus::Cell {
                row: index,
                field: RowField::Item,
            };
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("line {} added", index + 1),
            );
        }
        (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
            delete_focused_row(state, view_data, internal_tx);
        }
        (KeyCode::Char('s'), KeyModifiers::CONTROL) => {
            save_invoice(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Tab, _) => advance_focus(state, view_data, internal_tx, 1),
        (KeyCode::BackTab, _) => advance_focus(state, view_data, internal_tx, -1),
        (KeyCode::Enter, _) => match view_data.focus {
            InvoiceFocus::Supplier => open_selector(
                state,
                runtime,
                view_data,
                internal_tx,
                SelectorTarget::Supplier,
                "",
            ),
            InvoiceFocus::Cell {
                row,
                field: RowField::Item,
            } => {
                if let Some(key) = view_data.invoice.rows.get(row).map(|row| row.key) {
                    open_selector(
                        state,
                        runtime,
                        view_data,
                        internal_tx,
                        SelectorTarget::InvoiceItem(key),
                        "",
                    );
                }
            }
            _ => advance_focus(state, view_data, internal_tx, 1),
        },
        (KeyCode::Up, _) => move_vertical(state, view_data, internal_tx, -1),
        (KeyCode::Down, _) => move_vertical(state, view_data, internal_tx, 1),
        (KeyCode::Left, _) => move_horizontal(state, view_data, internal_tx, -1),
        (KeyCode::Right, _) => move_horizontal(state, view_data, internal_tx, 1),
        (KeyCode::Backspace, _) => erase_in_focus(view_data),
        (KeyCode::Char(ch), modifiers)
            if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            type_in_focus(state, runtime, view_data, internal_tx, ch);
        }
        _ => {}
    }
}

fn focus_index(focus: InvoiceFocus) -> usize {
    match focus {
        InvoiceFocus::Supplier => 0,
        InvoiceFocus::InvoiceNo => 1,
        InvoiceFocus::Date => 2,
        InvoiceFocus::Cell { row, field } => {
            let column = RowField::EDITABLE
                .iter()
                .position(|candidate| *candidate == field)
                .unwrap_or(0);
            HEADER_FIELD_COUNT + row * ROW_FIELD_COUNT + column
        }
    }
}

fn focus_at(index: usize) -> InvoiceFocus {
    match index {
        0 => InvoiceFocus::Supplier,
        1 => InvoiceFocus::InvoiceNo,
        2 => InvoiceFocus::Date,
        _ => {
            let offset = index - HEADER_FIELD_COUNT;
            InvoiceFocus::Cell {
                row: offset / ROW_FIELD_COUNT,
                field: RowField::EDITABLE[offset % ROW_FIELD_COUNT],
            }
        }
    }
}

fn set_focus(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    focus: InvoiceFocus,
) {
    if view_data.focus != focus {
        leave_focus(state, view_data, internal_tx);
        view_data.focus = focus;
    }
}

/// Validates the sudo-code cell on the way out; a bad code is reported and
/// cleared so it never reaches the saved invoice.
fn leave_focus(state: &mut AppState, view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    let InvoiceFocus::Cell {
        row,
        field: RowField::SudoCode,
    } = view_data.focus
    else {
        return;
    };
    let Some(invoice_row) = view_data.invoice.rows.get_mut(row) else {
        return;
    };
    let Err(error) = validate_sudo_letters(&invoice_row.sudo_code, &view_data.options.sudo) else {
        return;
    };
    invoice_row.sudo_code.clear();
    invoice_row.recalculate(&view_data.options.sudo);
    emit_status(
        state,
        view_data,
        internal_tx,
        format!("line {}: {error}", row + 1),
    );
}

fn advance_focus(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let count = HEADER_FIELD_COUNT + view_data.invoice.rows.len() * ROW_FIELD_COUNT;
    let next = focus_index(view_data.focus).saturating_add_signed(delta);
    if next < count {
        set_focus(state, view_data, internal_tx, focus_at(next));
        return;
    }

    let last_filled = view_data
        .invoice
        .rows
        .last()
        .is_some_and(|row| !row.is_blank());
    if last_filled {
        leave_focus(state, view_data, internal_tx);
        let index = view_data.invoice.push_row();
        view_data.focus = InvoiceFocus::Cell {
            row: index,
            field: RowField::Item,
        };
    }
}

fn move_vertical(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let last_row = view_data.invoice.rows.len().saturating_sub(1);
    let next = match view_data.focus {
        InvoiceFocus::Cell { row: 0, .. } if delta < 0 => InvoiceFocus::Supplier,
        InvoiceFocus::Cell { row, field } => InvoiceFocus::Cell {
            row: row.saturating_add_signed(delta).min(last_row),
            field,
        },
        _ if delta > 0 => InvoiceFocus::Cell {
            row: 0,
            field: RowField::Item,
        },
        header => header,
    };
    set_focus(state, view_data, internal_tx, next);
}

fn move_horizontal(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let next = match view_data.focus {
        InvoiceFocus::Cell { row, field } => {
            let column = RowField::EDITABLE
                .iter()
                .position(|candidate| *candidate == field)
                .unwrap_or(0)
                .saturating_add_signed(delta)
                .min(ROW_FIELD_COUNT - 1);
            InvoiceFocus::Cell {
                row,
                field: RowField::EDITABLE[column],
            }
        }
        header => focus_at(
            focus_index(header)
                .saturating_add_signed(delta)
                .min(HEADER_FIELD_COUNT - 1),
        ),
    };
    set_focus(state, view_data, internal_tx, next);
}

fn erase_in_focus(view_data: &mut ViewData) {
    match view_data.focus {
        InvoiceFocus::Supplier => view_data.invoice.supplier = None,
        InvoiceFocus::InvoiceNo => {
            view_data.invoice.invoice_no.pop();
        }
        InvoiceFocus::Date => {}
        InvoiceFocus::Cell { row, field } => {
            let Some(invoice_row) = view_data.invoice.rows.get_mut(row) else {
                return;
            };
            if field == RowField::Item {
                invoice_row.item_code.clear();
                invoice_row.item_name.clear();
            } else {
                invoice_row.field_mut(field).pop();
            }
            invoice_row.recalculate(&view_data.options.sudo);
        }
    }
}

fn type_in_focus<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    ch: char,
) {
    match view_data.focus {
        InvoiceFocus::Supplier => open_selector(
            state,
            runtime,
            view_data,
            internal_tx,
            SelectorTarget::Supplier,
            &ch.to_string(),
        ),
        InvoiceFocus::InvoiceNo => view_data.invoice.invoice_no.push(ch),
        InvoiceFocus::Date => {
            let shifted = match ch {
                '+' | '=' => view_data.invoice.date.next_day(),
                '-' => view_data.invoice.date.previous_day(),
                _ => None,
            };
            if let Some(date) = shifted {
                view_data.invoice.date = date;
            }
        }
        InvoiceFocus::Cell {
            row,
            field: RowField::Item,
        } => {
            if let Some(key) = view_data.invoice.rows.get(row).map(|row| row.key) {
                open_selector(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    SelectorTarget::InvoiceItem(key),
                    &ch.to_string(),
                );
            }
        }
        InvoiceFocus::Cell { row, field } => {
            let Some(invoice_row) = view_data.invoice.rows.get_mut(row) else {
                return;
            };
            if accepts_char(field, invoice_row.field(field), ch) {
                invoice_row.field_mut(field).push(ch);
                invoice_row.recalculate(&view_data.options.sudo);
            }
        }
    }
}

fn accepts_char(field: RowField, current: &str, ch: char) -> bool {
    if field == RowField::SudoCode {
        return ch.is_alphabetic();
    }
    if !field.is_numeric() {
        return false;
    }
    match ch {
        '0'..='9' => true,
        '.' => !current.contains('.'),
        '-' => current.is_empty(),
        _ => false,
    }
}

fn delete_focused_row(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let InvoiceFocus::Cell { row, field } = view_data.focus else {
        emit_status(state, view_data, internal_tx, "move to a line to delete it");
        return;
    };
    if view_data.invoice.remove_row(row).is_none() {
        return;
    }
    let last_row = view_data.invoice.rows.len().saturating_sub(1);
    view_data.focus = InvoiceFocus::Cell {
        row: row.min(last_row),
        field,
    };
    emit_status(
        state,
        view_data,
        internal_tx,
        format!("line {} removed", row + 1),
    );
}

fn save_invoice<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    view_data.invoice.recalculate_all(&view_data.options.sudo);
    if let Err(error) = view_data.invoice.validate(&view_data.options.sudo) {
        emit_status(state, view_data, internal_tx, format!("cannot save: {error}"));
        return;
    }

    let payload = view_data.invoice.payload();
    match runtime.save_purchase_invoice(&payload) {
        Ok(receipt) => {
            info!(
                invoice_no = %payload.invoice_no,
                rows = payload.rows.len(),
                "purchase invoice submitted"
            );
            view_data.invoice = PurchaseInvoice::new(
                view_data.invoice.date,
                view_data.options.default_tax_percent,
            );
            view_data.focus = InvoiceFocus::Supplier;
            emit_status(state, view_data, internal_tx, receipt);
        }
        Err(error) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("save failed: {error:#}"),
            );
        }
    }
}

fn handle_lookup_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let last = LookupSource::ALL.len() - 1;
    let source = LookupSource::ALL[view_data.lookup_cursor.min(last)];
    match (key.code, key.modifiers) {
        (KeyCode::Up, _) => view_data.lookup_cursor = view_data.lookup_cursor.saturating_sub(1),
        (KeyCode::Down, _) => view_data.lookup_cursor = (view_data.lookup_cursor + 1).min(last),
        (KeyCode::Enter, _) => open_selector(
            state,
            runtime,
            view_data,
            internal_tx,
            SelectorTarget::Lookup(source),
            "",
        ),
        (KeyCode::Esc, _) => view_data.lookup_detail = None,
        (KeyCode::Char(ch), modifiers)
            if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            open_selector(
                state,
                runtime,
                view_data,
                internal_tx,
                SelectorTarget::Lookup(source),
                &ch.to_string(),
            );
        }
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = Screen::ALL
        .iter()
        .position(|screen| *screen == state.screen)
        .unwrap_or(0);
    let tabs = Tabs::new(
        Screen::ALL
            .iter()
            .map(|screen| screen.label().to_owned())
            .collect::<Vec<String>>(),
    )
    .block(Block::default().title("storedesk").borders(Borders::ALL))
    .style(Style::default().fg(Color::White))
    .highlight_style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .select(selected);
    frame.render_widget(tabs, layout[0]);

    match state.screen {
        Screen::PurchaseInvoice => render_invoice(frame, layout[1], view_data),
        Screen::Lookups => render_lookups(frame, layout[1], view_data),
    }

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if let (Some(target), Some(selector)) = (view_data.overlay, view_data.active_selector()) {
        let overlay = selector_layout(frame.area());
        frame.render_widget(Clear, overlay.outer);
        let text = render_selector_overlay_text(
            selector,
            frame.area().width,
            usize::from(overlay.list.height),
        );
        let title = match target {
            SelectorTarget::InvoiceItem(_) => format!("{} (line item)", selector.config().title),
            _ => selector.config().title.clone(),
        };
        let widget = Paragraph::new(text).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(widget, overlay.outer);
    }

    if state.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_invoice(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(3)])
        .split(area);

    let header = Paragraph::new(render_invoice_header_text(view_data)).block(
        Block::default()
            .title("purchase invoice")
            .borders(Borders::ALL),
    );
    frame.render_widget(header, layout[0]);

    let focus_row = match view_data.focus {
        InvoiceFocus::Cell { row, .. } => Some(row),
        _ => None,
    };
    let visible_rows = usize::from(layout[1].height.saturating_sub(3));
    let offset = list_offset(focus_row, visible_rows);

    let mut header_cells = vec![Cell::from("#")];
    header_cells.extend(RowField::EDITABLE.iter().map(|field| Cell::from(field.label())));
    header_cells.extend(DERIVED_HEADERS.iter().map(|label| Cell::from(*label)));

    let rows = view_data
        .invoice
        .rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows.max(1))
        .map(|(index, row)| {
            let mut cells = vec![Cell::from((index + 1).to_string())];
            cells.extend(RowField::EDITABLE.iter().map(|field| {
                let focused = view_data.focus
                    == InvoiceFocus::Cell {
                        row: index,
                        field: *field,
                    };
                let style = if focused {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                Cell::from(grid_cell_text(row, *field)).style(style)
            }));
            cells.extend(
                derived_cells(row)
                    .into_iter()
                    .map(|text| Cell::from(text.to_owned()).style(Style::default().fg(Color::Gray))),
            );
            Row::new(cells)
        })
        .collect::<Vec<Row<'_>>>();

    let mut widths = vec![Constraint::Length(3), Constraint::Length(20)];
    widths.extend([Constraint::Length(7); ROW_FIELD_COUNT - 1]);
    widths.extend([Constraint::Length(9); DERIVED_HEADERS.len()]);

    let table = Table::new(rows, widths)
        .header(Row::new(header_cells).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().title("lines").borders(Borders::ALL));
    frame.render_widget(table, layout[1]);
}

const DERIVED_HEADERS: [&str; 7] = ["Avg.Wt", "Cost", "Net", "Sale", "Mrg%", "Wsl.Rate", "Amount"];

fn derived_cells(row: &InvoiceRow) -> [&str; 7] {
    let outputs = &row.outputs;
    [
        outputs.average_weight.as_str(),
        outputs.actual_cost.as_str(),
        outputs.net_cost.as_str(),
        outputs.sale_rate.as_str(),
        outputs.margin_percent.as_str(),
        outputs.wholesale_rate.as_str(),
        outputs.amount.as_str(),
    ]
}

fn grid_cell_text(row: &InvoiceRow, field: RowField) -> String {
    match field {
        RowField::Item if row.item_name.is_empty() => row.item_code.clone(),
        RowField::Item => format!("{} {}", row.item_code, row.item_name),
        other => row.field(other).to_owned(),
    }
}

fn render_invoice_header_text(view_data: &ViewData) -> String {
    let marker = |focus: InvoiceFocus| if view_data.focus == focus { ">" } else { " " };
    let invoice = &view_data.invoice;
    let supplier = match &invoice.supplier {
        Some(supplier) => format!("{} ({})", supplier.field("name"), supplier.field("code")),
        None => "<enter to choose>".to_owned(),
    };
    let totals = invoice.totals();
    [
        format!("{} supplier:   {supplier}", marker(InvoiceFocus::Supplier)),
        format!("{} invoice no: {}", marker(InvoiceFocus::InvoiceNo), invoice.invoice_no),
        format!("{} date:       {}  (+/- to change)", marker(InvoiceFocus::Date), invoice.date),
        format!(
            "  lines: {}  qty: {}  amount: {}",
            totals.line_count,
            totals.qty_text(),
            totals.amount_text()
        ),
    ]
    .join("\n")
}

fn render_lookups(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(10)])
        .split(area);

    let sources = Paragraph::new(render_lookup_sources_text(view_data))
        .block(Block::default().title("masters").borders(Borders::ALL));
    frame.render_widget(sources, layout[0]);

    let detail = Paragraph::new(render_lookup_detail_text(view_data))
        .block(Block::default().title("record").borders(Borders::ALL));
    frame.render_widget(detail, layout[1]);
}

fn render_lookup_sources_text(view_data: &ViewData) -> String {
    LookupSource::ALL
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let marker = if index == view_data.lookup_cursor { ">" } else { " " };
            format!("{marker} {}", source.label())
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn render_lookup_detail_text(view_data: &ViewData) -> String {
    let Some((source, item)) = &view_data.lookup_detail else {
        return "enter to browse the highlighted list".to_owned();
    };
    let config = source.selector_config();
    let mut lines = vec![format!("{}:", source.label())];
    for (index, key) in config.display_field_keys.iter().enumerate() {
        let header = config.header_names.get(index).unwrap_or(key);
        lines.push(format!("  {header}: {}", item.field(key)));
    }
    for (key, value) in item.fields() {
        if !config.display_field_keys.iter().any(|shown| shown == key) {
            lines.push(format!("  {key}: {value}"));
        }
    }
    lines.join("\n")
}

struct SelectorLayout {
    outer: Rect,
    list: Rect,
}

/// Border, then search line and column header above the list, footer below.
fn selector_layout(area: Rect) -> SelectorLayout {
    let outer = centered_rect(80, 70, area);
    let inner_x = outer.x.saturating_add(1);
    let inner_y = outer.y.saturating_add(1);
    let inner_height = outer.height.saturating_sub(2);
    SelectorLayout {
        outer,
        list: Rect::new(
            inner_x,
            inner_y.saturating_add(2),
            outer.width.saturating_sub(2),
            inner_height.saturating_sub(3),
        ),
    }
}

/// First row shown so the highlighted row stays inside a `height`-row viewport.
fn list_offset(highlighted: Option<usize>, height: usize) -> usize {
    match highlighted {
        Some(index) if height > 0 && index >= height => index + 1 - height,
        _ => 0,
    }
}

fn list_index_at(
    layout: &SelectorLayout,
    selector: &SelectorState,
    column: u16,
    row: u16,
) -> Option<usize> {
    let list = layout.list;
    let inside = column >= list.x
        && column < list.x.saturating_add(list.width)
        && row >= list.y
        && row < list.y.saturating_add(list.height);
    if !inside {
        return None;
    }
    let index = list_offset(selector.highlighted(), usize::from(list.height))
        + usize::from(row - list.y);
    (index < selector.items().len()).then_some(index)
}

fn render_selector_overlay_text(
    selector: &SelectorState,
    terminal_width: u16,
    list_height: usize,
) -> String {
    let config = selector.config();
    let columns = config.visible_columns(terminal_width);

    let search_line = match (selector.focus(), selector.search_text().is_empty()) {
        (SelectorFocus::Search, true) => format!("search> {}", config.search_placeholder),
        (SelectorFocus::Search, false) => format!("search> {}_", selector.search_text()),
        (SelectorFocus::List, _) => format!("search: {}", selector.search_text()),
    };
    let header_line = format!(
        "  {}",
        columns
            .iter()
            .map(|column| fit(column.header, column.width))
            .collect::<Vec<String>>()
            .join(" ")
    );

    let mut lines = vec![search_line, header_line.trim_end().to_owned()];
    let offset = list_offset(selector.highlighted(), list_height);
    for (index, item) in selector
        .items()
        .iter()
        .enumerate()
        .skip(offset)
        .take(list_height.max(1))
    {
        let marker = if selector.highlighted() == Some(index) {
            ">"
        } else {
            " "
        };
        let cells = columns
            .iter()
            .map(|column| fit(item.field(column.key), column.width))
            .collect::<Vec<String>>()
            .join(" ");
        lines.push(format!("{marker} {cells}").trim_end().to_owned());
    }

    let footer = if selector.is_loading_initial() {
        "loading...".to_owned()
    } else if selector.items().is_empty() {
        "no matches".to_owned()
    } else if selector.is_loading_more() {
        format!("{} shown, loading more...", selector.items().len())
    } else if selector.has_more() {
        format!("{} shown, scroll for more", selector.items().len())
    } else {
        format!("{} shown", selector.items().len())
    };
    lines.push(footer);
    lines.join("\n")
}

fn fit(value: &str, width: u16) -> String {
    let width = usize::from(width);
    let count = value.chars().count();
    if count <= width {
        return format!("{value:<width$}");
    }
    let mut truncated = value
        .chars()
        .take(width.saturating_sub(1))
        .collect::<String>();
    truncated.push('~');
    truncated
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let hints = match (view_data.overlay.is_some(), state.screen) {
        (true, _) => "type to search | up/down | enter choose | esc close",
        (false, Screen::PurchaseInvoice) => {
            "enter/tab next | shift+tab back | ctrl+n line | ctrl+d del | ctrl+s save | f2 screen | f1 help | ctrl+q"
        }
        (false, Screen::Lookups) => "up/down | enter browse | esc clear | f2 screen | f1 help | ctrl+q",
    };
    match &state.status_line {
        Some(status) => format!("{status} | {hints}"),
        None => hints.to_owned(),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | f2/shift+f2 screens | f1 help\n\
invoice: enter/tab next field | shift+tab back | arrows move | enter on supplier/item opens list\n\
invoice: ctrl+n add line | ctrl+d delete line | ctrl+s save | +/- change date\n\
invoice: code cell takes sudo letters; unknown letters are cleared when you leave it\n\
masters: up/down pick list | enter browse | type to search | esc clear record\n\
list: type to search | up/down or wheel move | enter or click choose | esc close"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, InvoiceFocus, SelectorTarget, UiOptions, ViewData,
        handle_key_event, handle_mouse_event, process_internal_events, render_invoice_header_text,
        render_lookup_detail_text, render_selector_overlay_text, selector_layout, status_text,
        tick,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::time::{Duration, Instant};
    use storedesk_app::{
        AppState, ListItem, LookupSource, PurchaseInvoicePayload, RowField, Screen,
        SelectorState, SudoMap,
    };
    use storedesk_testkit::DemoCatalog;
    use time::{Date, Month};

    #[derive(Debug, Default)]
    struct TestRuntime {
        catalog: DemoCatalog,
        fetches: Vec<(LookupSource, u32, String)>,
        saved: Vec<PurchaseInvoicePayload>,
        fail_fetch: bool,
    }

    impl AppRuntime for TestRuntime {
        fn fetch_page(
            &mut self,
            source: LookupSource,
            page: u32,
            search: &str,
        ) -> Result<Vec<ListItem>> {
            self.fetches.push((source, page, search.to_owned()));
            if self.fail_fetch {
                bail!("connection refused");
            }
            self.catalog.page(source, page, search)
        }

        fn save_purchase_invoice(&mut self, payload: &PurchaseInvoicePayload) -> Result<String> {
            self.saved.push(payload.clone());
            Ok(format!("saved invoice {}", payload.invoice_no))
        }
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: Sender<InternalEvent>,
        rx: Receiver<InternalEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, rx) = mpsc::channel();
            Self {
                state: AppState::default(),
                runtime: TestRuntime::default(),
                view_data: ViewData::new(UiOptions {
                    sudo: SudoMap::new("abcdefghij"),
                    default_tax_percent: 0.0,
                    responsive_breakpoint: 100,
                    invoice_date: Date::from_calendar_date(2026, Month::May, 2)
                        .expect("valid date"),
                }),
                tx,
                rx,
            }
        }

        fn press(&mut self, key: KeyEvent) -> bool {
            handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                key,
            )
        }

        fn key(&mut self, code: KeyCode) -> bool {
            self.press(KeyEvent::new(code, KeyModifiers::NONE))
        }

        fn ctrl(&mut self, ch: char) -> bool {
            self.press(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL))
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.key(KeyCode::Char(ch));
            }
        }

        fn drain(&mut self) {
            process_internal_events(
                &mut self.state,
                &mut self.view_data,
                &self.tx,
                &self.rx,
            );
        }

        fn tick_at(&mut self, now: Instant) {
            tick(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                now,
            );
        }

        fn selector(&self, source: LookupSource) -> &SelectorState {
            self.view_data
                .selectors
                .get(&source)
                .expect("selector should exist")
        }

        fn status(&self) -> &str {
            self.state.status_line.as_deref().unwrap_or("")
        }
    }

    #[test]
    fn ctrl_q_quits() {
        let mut harness = Harness::new();
        assert!(harness.ctrl('q'));
    }

    #[test]
    fn f2_cycles_screens() {
        let mut harness = Harness::new();
        harness.key(KeyCode::F(2));
        assert_eq!(harness.state.screen, Screen::Lookups);
        harness.key(KeyCode::F(2));
        assert_eq!(harness.state.screen, Screen::PurchaseInvoice);
    }

    #[test]
    fn help_overlay_absorbs_keys_until_closed() {
        let mut harness = Harness::new();
        harness.key(KeyCode::F(1));
        assert!(harness.state.help_visible);

        harness.key(KeyCode::Tab);
        assert_eq!(harness.view_data.focus, InvoiceFocus::Supplier);

        harness.key(KeyCode::Esc);
        assert!(!harness.state.help_visible);
        assert_eq!(harness.status(), "help hidden");
    }

    #[test]
    fn enter_on_supplier_opens_selector_with_first_page() {
        let mut harness = Harness::new();
        harness.key(KeyCode::Enter);
        assert_eq!(harness.view_data.overlay, Some(SelectorTarget::Supplier));
        assert!(harness.selector(LookupSource::Supplier).is_loading_initial());

        harness.drain();
        let selector = harness.selector(LookupSource::Supplier);
        assert_eq!(selector.items().len(), 20);
        assert!(selector.has_more());
        assert_eq!(selector.highlighted(), Some(0));
        assert_eq!(
            harness.runtime.fetches,
            vec![(LookupSource::Supplier, 1, String::new())]
        );
    }

    #[test]
    fn confirming_supplier_fills_header_and_swallows_the_repeat_enter() {
        let mut harness = Harness::new();
        harness.key(KeyCode::Enter);
        harness.drain();
        harness.key(KeyCode::Down);
        let expected = harness.selector(LookupSource::Supplier).items()[1].clone();

        harness.key(KeyCode::Enter);
        assert_eq!(harness.view_data.overlay, None);
        assert_eq!(harness.view_data.invoice.supplier, Some(expected));
        assert_eq!(harness.view_data.focus, InvoiceFocus::InvoiceNo);
        assert!(harness.status().starts_with("supplier "));

        harness.key(KeyCode::Enter);
        assert_eq!(harness.view_data.focus, InvoiceFocus::InvoiceNo);

        harness.key(KeyCode::Enter);
        assert_eq!(harness.view_data.focus, InvoiceFocus::Date);
    }

    #[test]
    fn escape_closes_without_selecting_and_drops_late_results() {
        let mut harness = Harness::new();
        harness.key(KeyCode::Enter);
        harness.key(KeyCode::Esc);
        assert_eq!(harness.view_data.overlay, None);

        harness.drain();
        assert!(harness.selector(LookupSource::Supplier).items().is_empty());
        assert_eq!(harness.view_data.invoice.supplier, None);
    }

    #[test]
    fn typed_search_waits_for_the_debounce() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::Cell {
            row: 0,
            field: RowField::Item,
        };
        harness.key(KeyCode::Enter);
        harness.drain();

        harness.type_text("bolt");
        assert_eq!(harness.runtime.fetches.len(), 1);

        harness.tick_at(Instant::now() + Duration::from_millis(400));
        assert_eq!(
            harness.runtime.fetches.last(),
            Some(&(LookupSource::Item, 1, "bolt".to_owned()))
        );

        harness.drain();
        let selector = harness.selector(LookupSource::Item);
        assert!(!selector.items().is_empty());
        assert!(
            selector
                .items()
                .iter()
                .all(|item| item.field("name").to_lowercase().starts_with("bolt"))
        );
    }

    #[test]
    fn typing_on_item_cell_opens_selector_with_that_letter() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::Cell {
            row: 0,
            field: RowField::Item,
        };
        harness.key(KeyCode::Char('n'));
        assert_eq!(
            harness.runtime.fetches,
            vec![(LookupSource::Item, 1, "n".to_owned())]
        );
    }

    #[test]
    fn choosing_an_item_fills_rates_and_recalculates() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::Cell {
            row: 0,
            field: RowField::Item,
        };
        harness.key(KeyCode::Enter);
        harness.drain();
        let item = harness.selector(LookupSource::Item).items()[0].clone();
        harness.key(KeyCode::Enter);

        let row = &harness.view_data.invoice.rows[0];
        assert_eq!(row.item_code, item.field("code"));
        assert_eq!(row.qty, "1");
        assert_eq!(row.purchase_rate, item.field("purchase_rate"));
        assert_eq!(row.assigned_rate, item.field("sale_rate"));
        assert!(!row.outputs.amount.is_empty());
        assert_eq!(
            harness.view_data.focus,
            InvoiceFocus::Cell {
                row: 0,
                field: RowField::Qty
            }
        );
    }

    #[test]
    fn moving_near_the_bottom_loads_the_next_page() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::Cell {
            row: 0,
            field: RowField::Item,
        };
        harness.key(KeyCode::Enter);
        harness.drain();

        for _ in 0..8 {
            harness.key(KeyCode::Down);
        }
        assert_eq!(harness.runtime.fetches.len(), 1);

        harness.key(KeyCode::Down);
        assert_eq!(
            harness.runtime.fetches.last(),
            Some(&(LookupSource::Item, 2, String::new()))
        );
        harness.drain();
        assert_eq!(harness.selector(LookupSource::Item).items().len(), 40);
        assert_eq!(harness.selector(LookupSource::Item).page(), 2);
    }

    #[test]
    fn fetch_failure_is_reported_on_the_status_line() {
        let mut harness = Harness::new();
        harness.runtime.fail_fetch = true;
        harness.key(KeyCode::Enter);
        harness.drain();

        assert!(harness.status().contains("could not load suppliers"));
        assert!(harness.selector(LookupSource::Supplier).items().is_empty());
        assert_eq!(harness.view_data.overlay, Some(SelectorTarget::Supplier));
    }

    #[test]
    fn clicking_a_row_selects_it() {
        let mut harness = Harness::new();
        harness.key(KeyCode::Enter);
        harness.drain();
        let expected = harness.selector(LookupSource::Supplier).items()[2].clone();

        let list = selector_layout(harness.view_data.terminal_area).list;
        handle_mouse_event(
            &mut harness.state,
            &mut harness.runtime,
            &mut harness.view_data,
            &harness.tx,
            MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: list.x + 3,
                row: list.y + 2,
                modifiers: KeyModifiers::NONE,
            },
        );
        assert_eq!(harness.view_data.invoice.supplier, Some(expected));
        assert_eq!(harness.view_data.overlay, None);
    }

    #[test]
    fn unknown_sudo_letters_are_cleared_when_leaving_the_cell() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::Cell {
            row: 0,
            field: RowField::SudoCode,
        };
        harness.type_text("bx");
        assert_eq!(harness.view_data.invoice.rows[0].sudo_code, "bx");

        harness.key(KeyCode::Tab);
        assert_eq!(harness.view_data.invoice.rows[0].sudo_code, "");
        assert!(harness.status().contains("unknown letters"));
        assert_eq!(
            harness.view_data.focus,
            InvoiceFocus::Cell {
                row: 0,
                field: RowField::ManualProfitPercent
            }
        );
    }

    #[test]
    fn valid_sudo_code_drives_the_profit_percent() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::Cell {
            row: 0,
            field: RowField::PurchaseRate,
        };
        harness.type_text("100");
        harness.view_data.focus = InvoiceFocus::Cell {
            row: 0,
            field: RowField::SudoCode,
        };
        harness.type_text("bc");
        harness.key(KeyCode::Tab);

        let row = &harness.view_data.invoice.rows[0];
        assert_eq!(row.sudo_code, "bc");
        assert_eq!(row.outputs.profit_percent, "12");
        assert_eq!(row.outputs.sale_rate, "112.00");
    }

    #[test]
    fn numeric_cells_only_take_numbers() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::Cell {
            row: 0,
            field: RowField::Qty,
        };
        harness.type_text("1a.5.");
        assert_eq!(harness.view_data.invoice.rows[0].qty, "1.5");

        harness.key(KeyCode::Backspace);
        assert_eq!(harness.view_data.invoice.rows[0].qty, "1.");
    }

    #[test]
    fn tab_past_the_last_cell_adds_a_line_only_after_input() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::Cell {
            row: 0,
            field: RowField::ManualProfitPercent,
        };
        harness.key(KeyCode::Tab);
        assert_eq!(harness.view_data.invoice.rows.len(), 1);

        harness.view_data.invoice.rows[0].qty = "2".to_owned();
        harness.key(KeyCode::Tab);
        assert_eq!(harness.view_data.invoice.rows.len(), 2);
        assert_eq!(
            harness.view_data.focus,
            InvoiceFocus::Cell {
                row: 1,
                field: RowField::Item
            }
        );
    }

    #[test]
    fn shift_tab_walks_back_into_the_header() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::Cell {
            row: 0,
            field: RowField::Item,
        };
        harness.key(KeyCode::BackTab);
        assert_eq!(harness.view_data.focus, InvoiceFocus::Date);
        harness.key(KeyCode::Up);
        assert_eq!(harness.view_data.focus, InvoiceFocus::Date);
        harness.key(KeyCode::Down);
        assert_eq!(
            harness.view_data.focus,
            InvoiceFocus::Cell {
                row: 0,
                field: RowField::Item
            }
        );
    }

    #[test]
    fn ctrl_n_adds_and_ctrl_d_removes_lines() {
        let mut harness = Harness::new();
        harness.ctrl('n');
        assert_eq!(harness.view_data.invoice.rows.len(), 2);
        assert_eq!(harness.status(), "line 2 added");

        harness.ctrl('d');
        assert_eq!(harness.view_data.invoice.rows.len(), 1);
        assert_eq!(
            harness.view_data.focus,
            InvoiceFocus::Cell {
                row: 0,
                field: RowField::Item
            }
        );

        harness.ctrl('d');
        assert_eq!(harness.view_data.invoice.rows.len(), 1);
    }

    #[test]
    fn ctrl_s_reports_validation_errors() {
        let mut harness = Harness::new();
        harness.ctrl('s');
        assert!(harness.status().starts_with("cannot save: supplier is required"));
        assert!(harness.runtime.saved.is_empty());
    }

    #[test]
    fn ctrl_s_saves_and_starts_a_fresh_invoice() {
        let mut harness = Harness::new();
        let invoice = &mut harness.view_data.invoice;
        invoice.supplier = Some(ListItem::new().with("code", "SP001").with("name", "Acme"));
        invoice.invoice_no = "PI-1".to_owned();
        invoice.rows[0].apply_item(
            &ListItem::new()
                .with("code", "IT0001")
                .with("name", "Bolt")
                .with("purchase_rate", "10"),
        );

        harness.ctrl('s');
        assert_eq!(harness.runtime.saved.len(), 1);
        assert_eq!(harness.runtime.saved[0].total_amount, "10.00");
        assert_eq!(harness.status(), "saved invoice PI-1");
        assert_eq!(harness.view_data.invoice.supplier, None);
        assert_eq!(harness.view_data.invoice.rows.len(), 1);
        assert_eq!(harness.view_data.focus, InvoiceFocus::Supplier);
    }

    #[test]
    fn date_field_shifts_by_day() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::Date;
        harness.key(KeyCode::Char('+'));
        harness.key(KeyCode::Char('+'));
        harness.key(KeyCode::Char('-'));
        assert_eq!(
            harness.view_data.invoice.date,
            Date::from_calendar_date(2026, Month::May, 3).expect("valid date")
        );
    }

    #[test]
    fn lookup_screen_browses_and_shows_the_chosen_record() {
        let mut harness = Harness::new();
        harness.key(KeyCode::F(2));
        harness.key(KeyCode::Enter);
        assert_eq!(
            harness.view_data.overlay,
            Some(SelectorTarget::Lookup(LookupSource::Unit))
        );
        harness.drain();
        harness.key(KeyCode::Enter);

        let detail = render_lookup_detail_text(&harness.view_data);
        assert!(detail.contains("Code: PCS"), "unexpected detail: {detail}");
        assert!(detail.contains("Unit: Pieces"));

        harness.key(KeyCode::Esc);
        assert_eq!(harness.view_data.lookup_detail, None);
    }

    #[test]
    fn narrow_terminals_show_two_selector_columns() {
        let mut harness = Harness::new();
        harness.key(KeyCode::Enter);
        harness.drain();
        let selector = harness.selector(LookupSource::Supplier);

        let wide = render_selector_overlay_text(selector, 140, 5);
        assert!(wide.contains("City"));
        assert!(wide.contains("GSTIN"));

        let narrow = render_selector_overlay_text(selector, 80, 5);
        assert!(narrow.contains("Code"));
        assert!(narrow.contains("Name"));
        assert!(!narrow.contains("City"));
        assert!(narrow.ends_with("20 shown, scroll for more"));
    }

    #[test]
    fn header_text_marks_focus_and_totals() {
        let mut harness = Harness::new();
        harness.view_data.focus = InvoiceFocus::InvoiceNo;
        harness.type_text("PI-9");
        let text = render_invoice_header_text(&harness.view_data);
        assert!(text.contains("> invoice no: PI-9"));
        assert!(text.contains("supplier:   <enter to choose>"));
        assert!(text.contains("lines: 0"));
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let mut harness = Harness::new();
        harness.ctrl('n');
        harness.ctrl('n');
        harness
            .tx
            .send(InternalEvent::ClearStatus { token: 1 })
            .expect("channel open");
        harness.drain();
        assert_eq!(harness.status(), "line 3 added");

        harness
            .tx
            .send(InternalEvent::ClearStatus { token: 2 })
            .expect("channel open");
        harness.drain();
        assert_eq!(harness.state.status_line, None);
        assert!(status_text(&harness.state, &harness.view_data).starts_with("enter/tab next"));
    }
}
