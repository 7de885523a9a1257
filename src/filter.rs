//! Cascading option filter.
//!
//! A fixed option list narrowed by a category constraint and a free-text
//! search, keeping the current selection whenever it is still visible.

/// Value of the "no selection" option.
pub const SENTINEL: &str = "";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    /// Empty means the option is shown under every category.
    pub category_id: String,
    /// Lower-cased text matched against the search term.
    pub search_text: String,
}

impl FilterOption {
    pub fn new(value: &str, label: &str, category_id: &str, search_text: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            category_id: category_id.to_string(),
            search_text: search_text.to_lowercase(),
        }
    }

    pub fn sentinel(label: &str) -> Self {
        Self::new(SENTINEL, label, "", "")
    }

    pub fn is_sentinel(&self) -> bool {
        self.value == SENTINEL
    }

    fn matches(&self, category: &str, term: &str) -> bool {
        (category.is_empty() || self.category_id.is_empty() || self.category_id == category)
            && (term.is_empty() || self.search_text.contains(term))
    }
}

#[derive(Debug, Clone)]
pub struct OptionFilter {
    all_options: Vec<FilterOption>,
    structure_filter: String,
    search_term: String,
    selection: String,
    visible: Vec<usize>,
}

impl OptionFilter {
    /// Captures the option set. The first sentinel found is moved to the front
    /// (one labelled "---------" is created if there is none); any further
    /// empty-valued options are dropped.
    pub fn new(options: Vec<FilterOption>) -> Self {
        let mut sentinel = None;
        let mut rest = Vec::with_capacity(options.len());
        for opt in options {
            if opt.is_sentinel() {
                if sentinel.is_none() {
                    sentinel = Some(opt);
                }
            } else {
                rest.push(opt);
            }
        }
        let mut all_options = Vec::with_capacity(rest.len() + 1);
        all_options.push(sentinel.unwrap_or_else(|| FilterOption::sentinel("---------")));
        all_options.extend(rest);

        let visible = (0..all_options.len()).collect();
        Self {
            all_options,
            structure_filter: String::new(),
            search_term: String::new(),
            selection: SENTINEL.to_string(),
            visible,
        }
    }

    pub fn all_options(&self) -> &[FilterOption] {
        &self.all_options
    }

    pub fn structure_filter(&self) -> &str {
        &self.structure_filter
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn selected(&self) -> &str {
        &self.selection
    }

    pub fn selected_option(&self) -> Option<&FilterOption> {
        if self.selection == SENTINEL {
            return None;
        }
        self.visible()
            .into_iter()
            .find(|o| o.value == self.selection)
    }

    pub fn visible(&self) -> Vec<&FilterOption> {
        self.visible.iter().map(|&i| &self.all_options[i]).collect()
    }

    pub fn visible_values(&self) -> Vec<&str> {
        self.visible.iter().map(|&i| self.all_options[i].value.as_str()).collect()
    }

    /// Select a visible option. Returns false (and leaves the selection
    /// alone) when `value` is not currently visible.
    pub fn select(&mut self, value: &str) -> bool {
        if self.visible.iter().any(|&i| self.all_options[i].value == value) {
            self.selection = value.to_string();
            true
        } else {
            false
        }
    }

    pub fn set_structure_filter(&mut self, category: &str) {
        self.structure_filter = category.to_string();
        self.refresh();
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.trim().to_lowercase();
        self.refresh();
    }

    /// Apply both constraints at once, refreshing a single time.
    pub fn apply(&mut self, category: &str, term: &str) {
        self.structure_filter = category.to_string();
        self.search_term = term.trim().to_lowercase();
        self.refresh();
    }

    /// Rebuild the visible set from the current constraints. The selection
    /// survives if still visible, otherwise it falls back to the sentinel.
    pub fn refresh(&mut self) {
        let previous = std::mem::take(&mut self.selection);

        let category = self.structure_filter.as_str();
        let term = self.search_term.as_str();
        let visible: Vec<usize> = self
            .all_options
            .iter()
            .enumerate()
            .filter(|(i, opt)| *i == 0 || opt.matches(category, term))
            .map(|(i, _)| i)
            .collect();

        let keep = visible.iter().any(|&i| self.all_options[i].value == previous);
        self.visible = visible;
        self.selection = if keep { previous } else { SENTINEL.to_string() };
    }
}

/// A control with a current value: the category selector or the search box.
pub trait ValueControl {
    fn current_value(&self) -> String;
}

/// The list whose options are filtered.
pub trait OptionTarget {
    /// The full option set, read once when the filter is bound.
    fn initial_options(&self) -> Vec<FilterOption>;
    fn selected_value(&self) -> String;
    /// Replace the shown options and the selection in one step.
    fn show(&mut self, visible: &[&FilterOption], selected: &str);
}

/// An [`OptionFilter`] wired to its three controls.
pub struct FilterBinding<C, S, T> {
    pub category: C,
    pub search: S,
    pub target: T,
    state: OptionFilter,
}

/// Bind a filter to its controls. Returns `None` (after logging a warning)
/// when any control is missing, leaving whatever is present untouched.
pub fn bind<C, S, T>(category: Option<C>, search: Option<S>, target: Option<T>) -> Option<FilterBinding<C, S, T>>
where
    C: ValueControl,
    S: ValueControl,
    T: OptionTarget,
{
    let (category, search, mut target) = match (category, search, target) {
        (Some(c), Some(s), Some(t)) => (c, s, t),
        (c, s, t) => {
            tracing::warn!(
                category = c.is_some(),
                search = s.is_some(),
                target = t.is_some(),
                "option filter not activated: missing control"
            );
            return None;
        }
    };

    let mut state = OptionFilter::new(target.initial_options());
    state.select(&target.selected_value());
    state.apply(&category.current_value(), &search.current_value());
    target.show(&state.visible(), state.selected());

    Some(FilterBinding {
        category,
        search,
        target,
        state,
    })
}

impl<C, S, T> FilterBinding<C, S, T>
where
    C: ValueControl,
    S: ValueControl,
    T: OptionTarget,
{
    pub fn state(&self) -> &OptionFilter {
        &self.state
    }

    /// Handle a change on either control: re-read both, refresh, and push the
    /// result to the target.
    pub fn on_change(&mut self) {
        self.state
            .apply(&self.category.current_value(), &self.search.current_value());
        tracing::debug!(
            category = self.state.structure_filter(),
            search = self.state.search_term(),
            visible = self.state.visible.len(),
            "option filter refreshed"
        );
        self.target.show(&self.state.visible(), self.state.selected());
    }

    /// Select on the list itself; no refresh needed.
    pub fn select(&mut self, value: &str) -> bool {
        let ok = self.state.select(value);
        if ok {
            self.target.show(&self.state.visible(), self.state.selected());
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn options() -> Vec<FilterOption> {
        vec![
            FilterOption::sentinel("All"),
            FilterOption::new("1", "Roof", "cat:A", "roof repair"),
            FilterOption::new("2", "Floor", "cat:B", "floor tile"),
        ]
    }

    fn labels(filter: &OptionFilter) -> Vec<&str> {
        filter.visible().iter().map(|o| o.label.as_str()).collect()
    }

    #[test]
    fn test_category_constraint() {
        let mut f = OptionFilter::new(options());
        f.set_structure_filter("cat:A");
        assert_eq!(labels(&f), vec!["All", "Roof"]);
    }

    #[test]
    fn test_search_constraint() {
        let mut f = OptionFilter::new(options());
        f.set_search_term("tile");
        assert_eq!(labels(&f), vec!["All", "Floor"]);
    }

    #[test]
    fn test_combined_constraints_reset_selection() {
        let mut f = OptionFilter::new(options());
        assert!(f.select("1"));
        f.apply("cat:A", "tile");
        assert_eq!(labels(&f), vec!["All"]);
        assert_eq!(f.selected(), "");
        assert!(f.selected_option().is_none());
    }

    #[test]
    fn test_selection_survives_when_still_visible() {
        let mut f = OptionFilter::new(options());
        f.select("2");
        f.set_search_term("FLOOR");
        assert_eq!(f.selected(), "2");
        assert_eq!(f.selected_option().unwrap().label, "Floor");
    }

    #[test]
    fn test_selection_does_not_come_back_after_reset() {
        let mut f = OptionFilter::new(options());
        f.select("1");
        f.set_structure_filter("cat:B");
        assert_eq!(f.selected(), "");
        f.set_structure_filter("");
        assert_eq!(f.selected(), "");
        assert_eq!(labels(&f), vec!["All", "Roof", "Floor"]);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let mut f = OptionFilter::new(options());
        f.select("2");
        f.apply("cat:B", "floor");
        let first: Vec<String> = f.visible_values().iter().map(|s| s.to_string()).collect();
        let first_sel = f.selected().to_string();
        f.refresh();
        assert_eq!(f.visible_values(), first);
        assert_eq!(f.selected(), first_sel);
    }

    #[test]
    fn test_stable_order_and_uncategorised_always_shown() {
        let mut f = OptionFilter::new(vec![
            FilterOption::sentinel("Any"),
            FilterOption::new("c", "Gamma", "s1", "gamma"),
            FilterOption::new("a", "Alpha", "", "alpha"),
            FilterOption::new("b", "Beta", "s1", "beta"),
            FilterOption::new("d", "Delta", "s2", "delta"),
        ]);
        f.set_structure_filter("s1");
        assert_eq!(f.visible_values(), vec!["", "c", "a", "b"]);
    }

    #[test]
    fn test_sentinel_moved_first_and_deduplicated() {
        let f = OptionFilter::new(vec![
            FilterOption::new("1", "Roof", "cat:A", "roof"),
            FilterOption::sentinel("All"),
            FilterOption::sentinel("Again"),
        ]);
        assert_eq!(f.visible_values(), vec!["", "1"]);
        assert_eq!(f.all_options()[0].label, "All");
    }

    #[test]
    fn test_missing_sentinel_is_created() {
        let f = OptionFilter::new(vec![FilterOption::new("1", "Roof", "", "roof")]);
        assert!(f.all_options()[0].is_sentinel());
    }

    #[test]
    fn test_select_rejects_hidden_value() {
        let mut f = OptionFilter::new(options());
        f.set_structure_filter("cat:B");
        assert!(!f.select("1"));
        assert_eq!(f.selected(), "");
    }

    #[test]
    fn test_sentinel_kept_even_when_search_excludes_it() {
        let mut f = OptionFilter::new(options());
        f.set_search_term("zzz");
        assert_eq!(f.visible_values(), vec![""]);
    }

    // Control doubles sharing state with the test body.

    #[derive(Clone, Default)]
    struct Input(Rc<RefCell<String>>);

    impl Input {
        fn set(&self, v: &str) {
            *self.0.borrow_mut() = v.to_string();
        }
    }

    impl ValueControl for Input {
        fn current_value(&self) -> String {
            self.0.borrow().clone()
        }
    }

    #[derive(Default)]
    struct Shown {
        values: Vec<String>,
        selected: String,
        pushes: usize,
    }

    #[derive(Clone)]
    struct Select {
        options: Vec<FilterOption>,
        initial: String,
        shown: Rc<RefCell<Shown>>,
    }

    impl OptionTarget for Select {
        fn initial_options(&self) -> Vec<FilterOption> {
            self.options.clone()
        }

        fn selected_value(&self) -> String {
            self.initial.clone()
        }

        fn show(&mut self, visible: &[&FilterOption], selected: &str) {
            // The selection must always be one of the shown options.
            assert!(visible.iter().any(|o| o.value == selected));
            let mut shown = self.shown.borrow_mut();
            shown.values = visible.iter().map(|o| o.value.clone()).collect();
            shown.selected = selected.to_string();
            shown.pushes += 1;
        }
    }

    fn select_with(initial: &str) -> (Select, Rc<RefCell<Shown>>) {
        let shown = Rc::new(RefCell::new(Shown::default()));
        (
            Select {
                options: options(),
                initial: initial.to_string(),
                shown: Rc::clone(&shown),
            },
            shown,
        )
    }

    #[test]
    fn test_bind_with_missing_control_is_noop() {
        let (select, shown) = select_with("");
        let binding = bind(None::<Input>, Some(Input::default()), Some(select));
        assert!(binding.is_none());
        assert_eq!(shown.borrow().pushes, 0);

        let missing_target: Option<FilterBinding<Input, Input, Select>> =
            bind(Some(Input::default()), Some(Input::default()), None);
        assert!(missing_target.is_none());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_missing_control_logs_warning() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let (select, _shown) = select_with("");
        tracing::subscriber::with_default(subscriber, || {
            assert!(bind(Some(Input::default()), None::<Input>, Some(select)).is_none());
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("missing control"), "{output}");
        assert!(output.contains("search=false"), "{output}");
    }

    #[test]
    fn test_bind_keeps_initial_selection_and_pushes_once() {
        let (select, shown) = select_with("2");
        let binding = bind(Some(Input::default()), Some(Input::default()), Some(select)).unwrap();
        assert_eq!(binding.state().selected(), "2");
        let shown = shown.borrow();
        assert_eq!(shown.pushes, 1);
        assert_eq!(shown.values, vec!["", "1", "2"]);
        assert_eq!(shown.selected, "2");
    }

    #[test]
    fn test_binding_follows_control_changes() {
        let category = Input::default();
        let search = Input::default();
        let (select, shown) = select_with("1");
        let mut binding = bind(Some(category.clone()), Some(search.clone()), Some(select)).unwrap();

        category.set("cat:A");
        binding.on_change();
        assert_eq!(shown.borrow().values, vec!["", "1"]);
        assert_eq!(shown.borrow().selected, "1");

        search.set("tile");
        binding.on_change();
        assert_eq!(shown.borrow().values, vec![""]);
        assert_eq!(shown.borrow().selected, "");

        category.set("");
        binding.on_change();
        assert_eq!(shown.borrow().values, vec!["", "2"]);
        assert!(binding.select("2"));
        assert_eq!(shown.borrow().selected, "2");
    }
}
