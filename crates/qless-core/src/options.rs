//! Typed, per-operation option structs.

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub priority: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub retries: Option<i64>,
    pub depends: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct CompleteOptions {
    pub next: Option<String>,
    pub delay: f64,
    pub depends: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecurOptions {
    pub tags: Option<Vec<String>>,
    pub priority: Option<i64>,
    pub retries: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependsAction {
    On,
    Off,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    Add,
    Remove,
    Get,
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAction {
    Track,
    Untrack,
    Peek,
}
