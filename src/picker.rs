//! Interactive line-item picker for capturing claims against a certificate.
//!
//! Three controls drive an [`OptionFilter`](crate::filter::OptionFilter): a
//! structure selector cycled with Tab, a search box fed by typing, and the
//! item list itself.

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use rusqlite::Connection;

use crate::certificates::add_claim;
use crate::error::{PaycertError, Result};
use crate::filter::{bind, FilterBinding, FilterOption, OptionTarget, ValueControl};
use crate::fmt::{line_total, money, parse_amount, quantity};
use crate::models::{LineItem, PaymentCertificate, Structure};
use crate::tui::{money_span, truncate, View, ViewAction, FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE, STATUS_STYLE};

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// Cycles through "all structures" and each structure of the project.
pub struct StructureSelector {
    choices: Vec<(String, String)>,
    index: usize,
}

impl StructureSelector {
    pub fn new(structures: &[Structure]) -> Self {
        let mut choices = vec![(String::new(), "All structures".to_string())];
        choices.extend(structures.iter().map(|s| (s.id.to_string(), s.name.clone())));
        Self { choices, index: 0 }
    }

    pub fn next(&mut self) {
        self.index = (self.index + 1) % self.choices.len();
    }

    pub fn prev(&mut self) {
        self.index = (self.index + self.choices.len() - 1) % self.choices.len();
    }

    pub fn label(&self) -> &str {
        &self.choices[self.index].1
    }
}

impl ValueControl for StructureSelector {
    fn current_value(&self) -> String {
        self.choices[self.index].0.clone()
    }
}

#[derive(Default)]
pub struct SearchInput {
    text: String,
}

impl SearchInput {
    pub fn push(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn pop(&mut self) {
        self.text.pop();
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl ValueControl for SearchInput {
    fn current_value(&self) -> String {
        self.text.clone()
    }
}

/// The item list. Keeps its own copy of what the filter last showed.
pub struct ItemList {
    options: Vec<FilterOption>,
    shown: Vec<FilterOption>,
    selected: String,
    cursor: usize,
}

impl ItemList {
    pub fn new(items: &[LineItem]) -> Self {
        let mut options = vec![FilterOption::sentinel("(choose a line item)")];
        options.extend(items.iter().map(|li| {
            FilterOption::new(
                &li.id.to_string(),
                &format!("{} {}", li.item_number, li.description),
                &li.structure_id.to_string(),
                &format!("{} {} {}", li.item_number, li.description, li.payment_reference),
            )
        }));
        Self {
            options,
            shown: Vec::new(),
            selected: String::new(),
            cursor: 0,
        }
    }

    pub fn shown(&self) -> &[FilterOption] {
        &self.shown
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn value_at(&self, index: usize) -> Option<&str> {
        self.shown.get(index).map(|o| o.value.as_str())
    }
}

impl OptionTarget for ItemList {
    fn initial_options(&self) -> Vec<FilterOption> {
        self.options.clone()
    }

    fn selected_value(&self) -> String {
        self.selected.clone()
    }

    fn show(&mut self, visible: &[&FilterOption], selected: &str) {
        self.shown = visible.iter().map(|o| (*o).clone()).collect();
        self.selected = selected.to_string();
        self.cursor = self.shown.iter().position(|o| o.value == selected).unwrap_or(0);
    }
}

// ---------------------------------------------------------------------------
// Picker view
// ---------------------------------------------------------------------------

enum Mode {
    Browse,
    Quantity(String),
}

pub struct LineItemPicker<'a> {
    conn: &'a Connection,
    binding: FilterBinding<StructureSelector, SearchInput, ItemList>,
    items: Vec<LineItem>,
    certificate: PaymentCertificate,
    project_name: String,
    mode: Mode,
    status_message: Option<String>,
    captured: usize,
}

impl<'a> LineItemPicker<'a> {
    pub fn new(
        conn: &'a Connection,
        project_name: &str,
        certificate: PaymentCertificate,
        structures: &[Structure],
        items: Vec<LineItem>,
    ) -> Result<Self> {
        let binding = bind(
            Some(StructureSelector::new(structures)),
            Some(SearchInput::default()),
            Some(ItemList::new(&items)),
        )
        .ok_or_else(|| PaycertError::Other("line-item picker could not be bound".into()))?;
        Ok(Self {
            conn,
            binding,
            items,
            certificate,
            project_name: project_name.to_string(),
            mode: Mode::Browse,
            status_message: None,
            captured: 0,
        })
    }

    /// Number of claims captured during this session.
    pub fn captured(&self) -> usize {
        self.captured
    }

    fn selected_item(&self) -> Option<&LineItem> {
        let id: i64 = self.binding.state().selected_option()?.value.parse().ok()?;
        self.items.iter().find(|li| li.id == id)
    }

    fn move_cursor(&mut self, down: bool) {
        let list = &self.binding.target;
        let len = list.shown().len();
        if len == 0 {
            return;
        }
        let next = if down {
            (list.cursor() + 1).min(len - 1)
        } else {
            list.cursor().saturating_sub(1)
        };
        if let Some(value) = list.value_at(next).map(str::to_string) {
            self.binding.select(&value);
        }
    }

    fn handle_browse_key(&mut self, code: KeyCode) -> Result<ViewAction> {
        match code {
            KeyCode::Esc => return Ok(ViewAction::Close),
            KeyCode::Tab => {
                self.binding.category.next();
                self.binding.on_change();
            }
            KeyCode::BackTab => {
                self.binding.category.prev();
                self.binding.on_change();
            }
            KeyCode::Backspace => {
                self.binding.search.pop();
                self.binding.on_change();
            }
            KeyCode::Char(c) => {
                self.binding.search.push(c);
                self.binding.on_change();
            }
            KeyCode::Up => self.move_cursor(false),
            KeyCode::Down => self.move_cursor(true),
            KeyCode::Enter => {
                if self.selected_item().is_none() {
                    return Err(PaycertError::Other("Select a line item first".into()));
                }
                self.mode = Mode::Quantity(String::new());
            }
            _ => {}
        }
        Ok(ViewAction::Continue)
    }

    fn handle_quantity_key(&mut self, code: KeyCode) -> Result<ViewAction> {
        let Mode::Quantity(input) = &mut self.mode else {
            return Ok(ViewAction::Continue);
        };
        match code {
            KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '.' | ',') => input.push(c),
            KeyCode::Enter => {
                let qty = parse_amount(input)?;
                self.mode = Mode::Browse;
                let item = self
                    .selected_item()
                    .ok_or_else(|| PaycertError::Other("Select a line item first".into()))?;
                add_claim(self.conn, &self.certificate, item, qty, false, false)?;
                let msg = format!(
                    "Captured {} x {} = {}",
                    item.item_number,
                    quantity(qty),
                    money(line_total(qty, item.unit_price)?)
                );
                self.captured += 1;
                self.status_message = Some(msg);
            }
            _ => {}
        }
        Ok(ViewAction::Continue)
    }

    fn draw_list(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let list = &self.binding.target;
        let rows = area.height as usize;
        let offset = list.cursor().saturating_sub(rows.saturating_sub(1));
        let mut lines = Vec::new();
        for (i, opt) in list.shown().iter().enumerate().skip(offset).take(rows) {
            let selected = opt.value == self.binding.state().selected();
            let marker = if i == list.cursor() { " > " } else { "   " };
            let style = if selected { SELECTED_STYLE } else { Style::default() };
            let mut spans = vec![Span::styled(format!("{marker}{:<56}", truncate(&opt.label, 56)), style)];
            if let Some(li) = self.items.iter().find(|li| li.id.to_string() == opt.value) {
                spans.push(Span::styled(format!(" {:<6} ", truncate(&li.unit_measurement, 6)), style));
                spans.push(money_span(li.unit_price));
            }
            lines.push(Line::from(spans));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }
}

impl View for LineItemPicker<'_> {
    fn draw(&mut self, frame: &mut Frame) {
        let [header_area, filter_area, sep, list_area, input_area, status_area, hints_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(frame.area());

        frame.render_widget(
            Paragraph::new(format!(
                " {} | Payment Certificate #{} | {} of {} items | {} captured",
                self.project_name,
                self.certificate.certificate_number,
                self.binding.target.shown().len().saturating_sub(1),
                self.binding.state().all_options().len().saturating_sub(1),
                self.captured
            ))
            .style(HEADER_STYLE),
            header_area,
        );

        let filter_line = Line::from(vec![
            Span::styled(" Structure: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("< {} >", self.binding.category.label())),
            Span::styled("   Search: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("{}_", self.binding.search.text())),
        ]);
        frame.render_widget(Paragraph::new(filter_line), filter_area);

        let sep_line = "\u{2501}".repeat(sep.width as usize);
        frame.render_widget(
            Paragraph::new(sep_line).style(Style::default().fg(Color::DarkGray)),
            sep,
        );

        self.draw_list(frame, list_area);

        if let Mode::Quantity(input) = &self.mode {
            let label = self
                .selected_item()
                .map(|li| format!("{} {}", li.item_number, li.description))
                .unwrap_or_default();
            frame.render_widget(
                Paragraph::new(format!(" Quantity for {}: {input}_", truncate(&label, 40))),
                input_area,
            );
        }

        if let Some(msg) = &self.status_message {
            frame.render_widget(Paragraph::new(format!(" {msg}")).style(STATUS_STYLE), status_area);
        }

        let hints = match self.mode {
            Mode::Browse => " Tab/Shift-Tab=structure  type=search  Up/Down=move  Enter=capture  Esc=done",
            Mode::Quantity(_) => " Enter=save  Esc=cancel",
        };
        frame.render_widget(Paragraph::new(hints).style(FOOTER_STYLE), hints_area);
    }

    fn handle_key(&mut self, code: KeyCode) -> ViewAction {
        let result = match self.mode {
            Mode::Browse => self.handle_browse_key(code),
            Mode::Quantity(_) => self.handle_quantity_key(code),
        };
        match result {
            Ok(action) => action,
            Err(e) => {
                tracing::debug!(error = %e, "picker event failed");
                self.status_message = Some(format!("Error: {e}"));
                ViewAction::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificates::{create_certificate, list_claims};
    use crate::db::test_db;
    use crate::models::Project;
    use crate::projects::fixtures::{d, item};
    use crate::projects::{add_line_item, add_project, add_structure, find_project, list_line_items, list_structures};

    fn seed(conn: &Connection) -> (Project, PaymentCertificate) {
        add_project(conn, "Clinic").unwrap();
        let p = find_project(conn, "Clinic").unwrap();
        add_structure(conn, p.id, "Block A", "").unwrap();
        add_structure(conn, p.id, "Block B", "").unwrap();
        let structures = list_structures(conn, p.id).unwrap();
        add_line_item(conn, &structures[0], &item("1.1", "Brickwork", "100", "50")).unwrap();
        add_line_item(conn, &structures[0], &item("1.2", "Plaster", "40", "80")).unwrap();
        add_line_item(conn, &structures[1], &item("2.1", "Brick paving", "25", "200")).unwrap();
        let cert = create_certificate(conn, &p, false, "").unwrap();
        (p, cert)
    }

    fn picker<'a>(conn: &'a Connection, p: &Project, cert: PaymentCertificate) -> LineItemPicker<'a> {
        let structures = list_structures(conn, p.id).unwrap();
        let items = list_line_items(conn, p.id).unwrap();
        LineItemPicker::new(conn, &p.name, cert, &structures, items).unwrap()
    }

    fn labels(p: &LineItemPicker<'_>) -> Vec<String> {
        p.binding.target.shown().iter().map(|o| o.label.clone()).collect()
    }

    fn type_text(p: &mut LineItemPicker<'_>, text: &str) {
        for c in text.chars() {
            p.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_initial_list_shows_everything() {
        let (_dir, conn) = test_db();
        let (p, cert) = seed(&conn);
        let picker = picker(&conn, &p, cert);
        assert_eq!(picker.binding.target.shown().len(), 4);
        assert!(picker.binding.target.shown()[0].is_sentinel());
    }

    #[test]
    fn test_tab_and_search_narrow_the_list() {
        let (_dir, conn) = test_db();
        let (p, cert) = seed(&conn);
        let mut picker = picker(&conn, &p, cert);

        picker.handle_key(KeyCode::Tab);
        assert_eq!(picker.binding.category.label(), "Block A");
        assert_eq!(labels(&picker)[1..], ["1.1 Brickwork", "1.2 Plaster"]);

        type_text(&mut picker, "BRICK");
        assert_eq!(labels(&picker)[1..], ["1.1 Brickwork"]);

        picker.handle_key(KeyCode::BackTab);
        assert_eq!(labels(&picker)[1..], ["1.1 Brickwork", "2.1 Brick paving"]);

        for _ in 0..5 {
            picker.handle_key(KeyCode::Backspace);
        }
        assert_eq!(picker.binding.target.shown().len(), 4);
    }

    #[test]
    fn test_selection_resets_when_filtered_out() {
        let (_dir, conn) = test_db();
        let (p, cert) = seed(&conn);
        let mut picker = picker(&conn, &p, cert);
        picker.handle_key(KeyCode::Down);
        assert_eq!(picker.selected_item().map(|li| li.item_number.as_str()), Some("1.1"));

        type_text(&mut picker, "plaster");
        assert!(picker.selected_item().is_none());
        assert_eq!(picker.binding.target.cursor(), 0);
    }

    #[test]
    fn test_enter_without_selection_reports_error() {
        let (_dir, conn) = test_db();
        let (p, cert) = seed(&conn);
        let mut picker = picker(&conn, &p, cert);
        assert!(matches!(picker.handle_key(KeyCode::Enter), ViewAction::Continue));
        assert!(picker.status_message.as_deref().unwrap_or("").starts_with("Error:"));
    }

    #[test]
    fn test_capture_claim_through_picker() {
        let (_dir, conn) = test_db();
        let (p, cert) = seed(&conn);
        let cert_id = cert.id;
        let mut picker = picker(&conn, &p, cert);
        picker.handle_key(KeyCode::Down);
        picker.handle_key(KeyCode::Down);
        picker.handle_key(KeyCode::Enter);
        type_text(&mut picker, "12.5");
        picker.handle_key(KeyCode::Enter);

        assert_eq!(picker.captured(), 1);
        let claims = list_claims(&conn, cert_id).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].item_number, "1.2");
        assert_eq!(claims[0].total_price, d("500"));
    }

    #[test]
    fn test_bad_quantity_keeps_view_open() {
        let (_dir, conn) = test_db();
        let (p, cert) = seed(&conn);
        let mut picker = picker(&conn, &p, cert);
        picker.handle_key(KeyCode::Down);
        picker.handle_key(KeyCode::Enter);
        picker.handle_key(KeyCode::Enter);
        assert!(picker.status_message.is_some());
        assert_eq!(picker.captured(), 0);
        assert!(matches!(picker.handle_key(KeyCode::Esc), ViewAction::Continue));
        assert!(matches!(picker.handle_key(KeyCode::Esc), ViewAction::Close));
    }

    #[test]
    fn test_minus_sign_is_not_accepted_as_quantity() {
        let (_dir, conn) = test_db();
        let (p, cert) = seed(&conn);
        let cert_id = cert.id;
        let mut picker = picker(&conn, &p, cert);
        picker.handle_key(KeyCode::Down);
        picker.handle_key(KeyCode::Enter);
        type_text(&mut picker, "-3");
        assert!(matches!(&picker.mode, Mode::Quantity(input) if input == "3"));
        picker.handle_key(KeyCode::Enter);
        assert_eq!(picker.captured(), 1);
        assert_eq!(list_claims(&conn, cert_id).unwrap()[0].total_price, d("300"));
    }

    #[test]
    fn test_oversized_quantity_reports_error_and_keeps_view_open() {
        let (_dir, conn) = test_db();
        let (p, cert) = seed(&conn);
        let cert_id = cert.id;
        let mut picker = picker(&conn, &p, cert);
        picker.handle_key(KeyCode::Down);
        picker.handle_key(KeyCode::Enter);
        type_text(&mut picker, "79228162514264337593543950335");
        assert!(matches!(picker.handle_key(KeyCode::Enter), ViewAction::Continue));
        assert!(picker
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("too large")));
        assert_eq!(picker.captured(), 0);
        assert!(list_claims(&conn, cert_id).unwrap().is_empty());
    }
}
