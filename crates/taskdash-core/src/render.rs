use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::auth::{Role, User, demo_credentials};
use crate::config::Config;
use crate::dashboard::{DashboardView, Phase};
use crate::filter::PaginatedResult;
use crate::task::{Priority, Status, Task};

const SKELETON_ROWS: usize = 5;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Colors only when the config allows it and stdout is a terminal.
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);
        Ok(Self::with_color(color && io::stdout().is_terminal()))
    }

    pub fn with_color(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self::with_color(false)
    }

    /// The whole dashboard page for the view's current phase.
    #[tracing::instrument(skip(self, out, view, categories, now))]
    pub fn write_dashboard<W: Write>(
        &self,
        out: &mut W,
        view: &DashboardView,
        categories: &[String],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("Dashboard", "1"))?;
        self.write_search_box(out, view)?;
        self.write_filters(out, view, categories)?;
        writeln!(out)?;

        match view.phase() {
            Phase::LoginRequired => self.write_login_prompt(out)?,
            Phase::Loading => self.write_skeleton(out)?,
            Phase::Failed(message) => self.write_error(out, None, message)?,
            Phase::Empty => self.write_empty(out)?,
            Phase::Ready(result) => {
                self.write_task_table(out, &result.data, now)?;
                writeln!(out)?;
                self.write_pagination(out, result)?;
            }
            Phase::Idle => {}
        }

        Ok(())
    }

    pub fn write_search_box<W: Write>(&self, out: &mut W, view: &DashboardView) -> anyhow::Result<()> {
        let pending = if view.search_pending {
            self.paint(" (searching...)", "2")
        } else {
            String::new()
        };
        if view.search.is_empty() {
            writeln!(
                out,
                "Search: {}{pending}",
                self.paint("Search by title, description, or assignee...", "2")
            )?;
        } else {
            writeln!(out, "Search: {}{pending}", view.search)?;
        }
        Ok(())
    }

    pub fn write_filters<W: Write>(
        &self,
        out: &mut W,
        view: &DashboardView,
        categories: &[String],
    ) -> anyhow::Result<()> {
        let snapshot = &view.snapshot;
        writeln!(
            out,
            "Status: {}  Priority: {}  Category: {}  Per page: {}",
            snapshot.status, snapshot.priority, snapshot.category, snapshot.page_size
        )?;
        if !categories.is_empty() {
            writeln!(out, "Categories: {}", categories.join(", "))?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, out, tasks, now))]
    pub fn write_task_table<W: Write>(
        &self,
        out: &mut W,
        tasks: &[Task],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Status".to_string(),
            "Priority".to_string(),
            "Category".to_string(),
            "Assignee".to_string(),
            "Updated".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(&task.id, "33"),
                    task.title.clone(),
                    self.paint(task.status.as_str(), status_color(task.status)),
                    self.paint(task.priority.as_str(), priority_color(task.priority)),
                    task.category.clone(),
                    task.assignee.clone(),
                    relative_age(task.updated_at, now),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    pub fn write_pagination<W: Write>(
        &self,
        out: &mut W,
        result: &PaginatedResult<Task>,
    ) -> anyhow::Result<()> {
        if let Some((from, to)) = result.showing_range() {
            writeln!(out, "Showing {from} to {to} of {} results", result.total)?;
        }
        if result.total_pages > 0 {
            writeln!(out, "Page {} of {}", result.page, result.total_pages)?;
        }

        let previous = if result.has_previous() {
            "< Previous".to_string()
        } else {
            self.paint("< Previous", "2")
        };
        let next = if result.has_next() {
            "Next >".to_string()
        } else {
            self.paint("Next >", "2")
        };
        writeln!(out, "{previous}  {next}")?;
        Ok(())
    }

    pub fn write_skeleton<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("Loading...", "2"))?;
        for _ in 0..SKELETON_ROWS {
            writeln!(out, "{}", self.paint(&"░".repeat(48), "2"))?;
        }
        Ok(())
    }

    /// Error panel with a retry hint. `title` defaults to "Error".
    pub fn write_error<W: Write>(
        &self,
        out: &mut W,
        title: Option<&str>,
        message: &str,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(title.unwrap_or("Error"), "31;1"))?;
        writeln!(out, "{message}")?;
        writeln!(out, "Try again: rerun the command to retry.")?;
        Ok(())
    }

    pub fn write_empty<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("No data found", "1"))?;
        writeln!(out, "Try adjusting your filters or search query")?;
        Ok(())
    }

    pub fn write_login_prompt<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("Login Required", "1"))?;
        writeln!(
            out,
            "Please sign in to view the dashboard data and access all features"
        )?;
        writeln!(out)?;
        writeln!(out, "Demo credentials:")?;
        for (role, email, password) in demo_credentials() {
            let label = match role {
                Role::Admin => "Admin",
                Role::User => "User",
            };
            writeln!(out, "  {label}: {email} / {password}")?;
        }
        writeln!(out, "Sign in with: taskdash login --email <EMAIL> --password <PASSWORD>")?;
        Ok(())
    }

    pub fn write_profile<W: Write>(&self, out: &mut W, user: &User) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("Profile", "1"))?;
        writeln!(out, "Manage your account information and preferences")?;
        writeln!(out)?;
        writeln!(out, "[{}]  {}", self.paint(&user.initials(), "7"), user.name)?;
        writeln!(out, "      {}", user.email)?;
        writeln!(out)?;
        writeln!(out, "Full Name       {}", user.name)?;
        writeln!(out, "Email Address   {}", user.email)?;
        writeln!(out, "Role            {}", user.role.label())?;
        writeln!(out, "Account Status  {}", self.paint("Active", "32"))?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn status_color(status: Status) -> &'static str {
    match status {
        Status::Active => "34",
        Status::Pending => "33",
        Status::Completed => "32",
        Status::Cancelled => "90",
    }
}

fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "37",
        Priority::Medium => "33",
        Priority::High => "31",
    }
}

/// Human distance between `then` and `now`, e.g. "3 days ago" or "in about 2 hours".
pub fn relative_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    let distance = distance_words(seconds.unsigned_abs());
    if seconds >= 0 {
        format!("{distance} ago")
    } else {
        format!("in {distance}")
    }
}

fn distance_words(seconds: u64) -> String {
    const MINUTES_PER_DAY: u64 = 1440;
    const MINUTES_PER_MONTH: u64 = 43_200;
    const MINUTES_PER_YEAR: u64 = 525_600;

    // Rounded to the nearest minute.
    let minutes = (seconds + 30) / 60;

    match minutes {
        0 => "less than a minute".to_string(),
        1 => "1 minute".to_string(),
        2..=44 => format!("{minutes} minutes"),
        45..=89 => "about 1 hour".to_string(),
        90..=1439 => format!("about {} hours", (minutes + 30) / 60),
        1440..=2519 => "1 day".to_string(),
        2520..=43_199 => format!("{} days", (minutes + MINUTES_PER_DAY / 2) / MINUTES_PER_DAY),
        43_200..=86_399 => {
            let months = (minutes + MINUTES_PER_MONTH / 2) / MINUTES_PER_MONTH;
            format!("about {months} month{}", if months == 1 { "" } else { "s" })
        }
        86_400..=MINUTES_PER_YEAR => {
            format!("{} months", (minutes + MINUTES_PER_MONTH / 2) / MINUTES_PER_MONTH)
        }
        _ => {
            let years = minutes / MINUTES_PER_YEAR;
            let remainder_months = (minutes % MINUTES_PER_YEAR) / MINUTES_PER_MONTH;
            let plural = |n: u64| if n == 1 { "" } else { "s" };
            if remainder_months < 3 {
                format!("about {years} year{}", plural(years))
            } else if remainder_months < 9 {
                format!("over {years} year{}", plural(years))
            } else {
                format!("almost {} years", years + 1)
            }
        }
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Renderer, distance_words, relative_age, strip_ansi};
    use crate::auth::authenticate;
    use crate::config::Config;
    use crate::dashboard::DashboardView;
    use crate::datastore::MockDataStore;
    use crate::filter::FilterSnapshot;

    fn render<F>(write: F) -> String
    where
        F: FnOnce(&Renderer, &mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut buf = Vec::new();
        write(&Renderer::plain(), &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn view(snapshot: FilterSnapshot, authenticated: bool) -> DashboardView {
        let store = MockDataStore::fixture().unwrap();
        DashboardView {
            search: snapshot.search.clone(),
            result: Some(store.query_now(&snapshot)),
            snapshot,
            loading: false,
            error: None,
            authenticated,
            search_pending: false,
        }
    }

    #[test]
    fn relative_age_matches_common_phrasings() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        assert_eq!(relative_age(now - Duration::seconds(10), now), "less than a minute ago");
        assert_eq!(relative_age(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(relative_age(now - Duration::hours(3), now), "about 3 hours ago");
        assert_eq!(relative_age(now - Duration::days(4), now), "4 days ago");
        assert_eq!(relative_age(now + Duration::hours(1), now), "in about 1 hour");
        assert_eq!(distance_words(60 * 60 * 24 * 365 * 2), "about 2 years");
    }

    #[test]
    fn table_aligns_columns_and_shows_relative_updates() {
        let store = MockDataStore::fixture().unwrap();
        let task = &store.tasks()[0];
        let now = task.updated_at + Duration::days(2);

        let out = render(|r, buf| r.write_task_table(buf, std::slice::from_ref(task), now));
        let lines: Vec<_> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID Title"));
        assert!(lines[2].contains("Implement user authentication"));
        assert!(lines[2].contains("2 days ago"));
    }

    #[test]
    fn pagination_reports_the_visible_range() {
        let store = MockDataStore::fixture().unwrap();
        let result = store.query_now(&FilterSnapshot {
            page: 2,
            page_size: 5,
            ..FilterSnapshot::default()
        });

        let out = render(|r, buf| r.write_pagination(buf, &result));
        assert!(out.contains("Showing 6 to 10 of 10 results"));
        assert!(out.contains("Page 2 of 2"));
    }

    #[test]
    fn dashboard_picks_the_panel_for_each_phase() {
        let now = Utc::now();

        let signed_out = render(|r, buf| {
            r.write_dashboard(buf, &view(FilterSnapshot::default(), false), &[], now)
        });
        assert!(signed_out.contains("Login Required"));
        assert!(signed_out.contains("admin@example.com / admin123"));

        let empty = render(|r, buf| {
            let snapshot = FilterSnapshot {
                search: "zzz-no-match".to_string(),
                ..FilterSnapshot::default()
            };
            r.write_dashboard(buf, &view(snapshot, true), &[], now)
        });
        assert!(empty.contains("No data found"));
        assert!(empty.contains("Try adjusting your filters or search query"));

        let failed = render(|r, buf| {
            let mut failed = view(FilterSnapshot::default(), true);
            failed.error = Some("backend unavailable".to_string());
            r.write_dashboard(buf, &failed, &[], now)
        });
        assert!(failed.contains("Error\nbackend unavailable"));
        assert!(failed.contains("retry"));

        let loading = render(|r, buf| {
            let mut loading = view(FilterSnapshot::default(), true);
            loading.loading = true;
            r.write_dashboard(buf, &loading, &[], now)
        });
        assert!(loading.contains("Loading..."));

        let ready = render(|r, buf| {
            r.write_dashboard(buf, &view(FilterSnapshot::default(), true), &[], now)
        });
        assert!(ready.contains("Showing 1 to 10 of 10 results"));
    }

    #[test]
    fn profile_card_shows_initials_and_role_label() {
        let user = authenticate("admin@example.com", "admin123").unwrap();
        let out = render(|r, buf| r.write_profile(buf, &user));
        assert!(out.contains("[AU]  Admin User"));
        assert!(out.contains("Role            Administrator"));
        assert!(out.contains("Account Status  Active"));
    }

    #[test]
    fn colored_renderer_paints_into_any_writer() {
        let mut buf = Vec::new();
        Renderer::with_color(true).write_empty(&mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("\x1b[1mNo data found\x1b[0m"));
        assert_eq!(strip_ansi(&out), render(|r, buf| r.write_empty(buf)));
    }

    #[test]
    fn color_off_in_config_disables_painting() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("color".to_string(), "off".to_string())]);
        let mut buf = Vec::new();
        Renderer::new(&cfg).unwrap().write_empty(&mut buf).unwrap();
        assert!(!String::from_utf8(buf).unwrap().contains('\x1b'));

        cfg.apply_overrides(vec![("color".to_string(), "purple".to_string())]);
        assert!(Renderer::new(&cfg).is_err());
    }

    #[test]
    fn strip_ansi_removes_color_codes() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
