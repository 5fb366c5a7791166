use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::task::{Priority, Status, Task};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

const ALL: &str = "all";

/// A single filter dimension: either unconstrained (`all`) or one exact value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Choice<T> {
    All,
    Only(T),
}

impl<T> Default for Choice<T> {
    fn default() -> Self {
        Choice::All
    }
}

impl<T: PartialEq> Choice<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(wanted) => wanted == value,
        }
    }
}

impl<T> Choice<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Choice::All)
    }
}

impl<T: fmt::Display> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::All => f.write_str(ALL),
            Choice::Only(value) => value.fmt(f),
        }
    }
}

impl<T> FromStr for Choice<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == ALL {
            return Ok(Choice::All);
        }
        trimmed
            .parse::<T>()
            .map(Choice::Only)
            .map_err(|err| anyhow!("invalid filter value {trimmed:?}: {err}"))
    }
}

impl<T: fmt::Display> Serialize for Choice<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T> Deserialize<'de> for Choice<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub type StatusFilter = Choice<Status>;
pub type PriorityFilter = Choice<Priority>;
pub type CategoryFilter = Choice<String>;

/// Every search, filter and pagination parameter at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSnapshot {
    pub search: String,
    pub status: StatusFilter,
    pub priority: PriorityFilter,
    pub category: CategoryFilter,
    pub page: u32,
    pub page_size: u32,
}

impl Default for FilterSnapshot {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: Choice::All,
            priority: Choice::All,
            category: Choice::All,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FilterSnapshot {
    /// Zero means "unspecified" and falls back to the first page.
    pub fn effective_page(&self) -> u32 {
        if self.page == 0 { DEFAULT_PAGE } else { self.page }
    }

    pub fn effective_page_size(&self) -> u32 {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }

    /// Search, status, priority and category stages combined; pagination is not applied.
    pub fn matches(&self, task: &Task) -> bool {
        let needle = self.search.to_lowercase();
        (needle.is_empty() || task.matches_text(&needle))
            && self.status.admits(&task.status)
            && self.priority.admits(&task.priority)
            && self.category.admits(&task.category)
    }

    #[tracing::instrument(skip(self, tasks), fields(candidates = tasks.len()))]
    pub fn apply(&self, tasks: &[Task]) -> PaginatedResult<Task> {
        let matched: Vec<Task> = tasks
            .iter()
            .filter(|task| self.matches(task))
            .cloned()
            .collect();
        trace!(matched = matched.len(), "filter pipeline finished");
        paginate(matched, self.effective_page(), self.effective_page_size())
    }
}

/// One page of matches plus the totals of the unpaginated match set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResult<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// 1-based inclusive item range shown on this page, `None` when the page is empty.
    pub fn showing_range(&self) -> Option<(usize, usize)> {
        if self.data.is_empty() {
            return None;
        }
        let offset = page_offset(self.page, self.page_size);
        Some((offset + 1, offset + self.data.len()))
    }
}

pub fn total_pages(total: usize, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total.div_ceil(page_size as usize);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

fn page_offset(page: u32, page_size: u32) -> usize {
    (page.saturating_sub(1) as usize).saturating_mul(page_size as usize)
}

/// Slices `items` to one page. A page past the end yields empty `data`.
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: u32) -> PaginatedResult<T> {
    let total = items.len();
    let start = page_offset(page, page_size).min(total);
    let end = start.saturating_add(page_size as usize).min(total);

    let data = items.into_iter().skip(start).take(end - start).collect();

    PaginatedResult {
        data,
        total,
        page,
        page_size,
        total_pages: total_pages(total, page_size),
    }
}
