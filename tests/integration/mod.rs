//! Integration tests for the Object Explorer coordinator

mod expansion_coalescing;
mod merge_order;
mod view_adapter;
