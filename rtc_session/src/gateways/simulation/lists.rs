//! Two-buffer list model for the simulated card.
//!
//! Mirrors what the card firmware does with its two command lists:
//! one buffer can be loaded while the other executes. Execution finishes
//! after a configurable number of status register reads, and the read on
//! which it finishes reports BUSY and USED together, the same transition
//! instant a real card exposes.

use rtc_common::card::status::{ErrorMask, ListStatus};
use rtc_common::card::types::{ListBuffer, ListState};
use tracing::debug;

/// Simulated list buffers.
#[derive(Debug, Clone)]
pub struct ListModel {
    /// Current register contents
    status: ListStatus,
    /// Buffer currently accepting commands
    loading: Option<ListBuffer>,
    /// Executing buffer and remaining status reads until it completes
    executing: Option<(ListBuffer, u32)>,
    /// Status reads an execution lasts
    execution_polls: u32,
    /// Load position requested by the last `start`
    position: u32,
}

impl ListModel {
    /// Create an idle model.
    pub fn new(execution_polls: u32) -> Self {
        Self {
            status: ListStatus::empty(),
            loading: None,
            executing: None,
            execution_polls,
            position: 0,
        }
    }

    /// Current register contents without advancing execution.
    pub fn status(&self) -> ListStatus {
        self.status
    }

    /// Load position requested by the last successful `start`.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Drop all list state (card released).
    pub fn reset(&mut self) {
        *self = Self::new(self.execution_polls);
    }

    /// Open `buffer` for loading.
    pub fn start(&mut self, buffer: ListBuffer, position: u32) -> Result<(), ErrorMask> {
        if self.status.has(buffer, ListState::Load) || self.status.has(buffer, ListState::Busy) {
            return Err(ErrorMask::BUSY);
        }
        if self.loading.is_some() {
            // Only one buffer can be loaded at a time.
            return Err(ErrorMask::BUSY);
        }

        self.status.remove(
            ListStatus::flag(buffer, ListState::Ready) | ListStatus::flag(buffer, ListState::Used),
        );
        self.status.insert(ListStatus::flag(buffer, ListState::Load));
        self.loading = Some(buffer);
        self.position = position;
        debug!("Simulated {} loading from position {}", buffer, position);
        Ok(())
    }

    /// Close the loading buffer.
    pub fn end_load(&mut self) -> Result<ListBuffer, ErrorMask> {
        let buffer = self.loading.take().ok_or(ErrorMask::IGNORED)?;
        self.status.remove(ListStatus::flag(buffer, ListState::Load));
        self.status.insert(ListStatus::flag(buffer, ListState::Ready));
        Ok(buffer)
    }

    /// Start executing a ready buffer.
    pub fn execute(&mut self, buffer: ListBuffer) -> Result<(), ErrorMask> {
        if self.executing.is_some() {
            return Err(ErrorMask::BUSY);
        }
        if !self.status.has(buffer, ListState::Ready) {
            return Err(ErrorMask::IGNORED);
        }

        self.status.remove(ListStatus::flag(buffer, ListState::Ready));
        self.status.insert(ListStatus::flag(buffer, ListState::Busy));
        self.executing = Some((buffer, self.execution_polls));
        Ok(())
    }

    /// Read the register, advancing a running execution by one step.
    pub fn observe(&mut self) -> ListStatus {
        match self.executing {
            Some((buffer, 0)) => {
                self.status.insert(ListStatus::flag(buffer, ListState::Used));
                let snapshot = self.status;
                self.status.remove(ListStatus::flag(buffer, ListState::Busy));
                self.executing = None;
                debug!("Simulated {} finished executing", buffer);
                snapshot
            }
            Some((buffer, remaining)) => {
                self.executing = Some((buffer, remaining - 1));
                self.status
            }
            None => self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_start_on_loading_buffer_is_busy() {
        let mut lists = ListModel::new(0);
        assert!(lists.start(ListBuffer::List1, 0).is_ok());
        assert_eq!(lists.start(ListBuffer::List1, 0), Err(ErrorMask::BUSY));
        // The other buffer cannot load concurrently either.
        assert_eq!(lists.start(ListBuffer::List2, 0), Err(ErrorMask::BUSY));
    }

    #[test]
    fn test_full_cycle_reports_transition_instant() {
        let mut lists = ListModel::new(1);
        lists.start(ListBuffer::List1, 0).unwrap();
        assert_eq!(lists.end_load(), Ok(ListBuffer::List1));
        assert!(lists.status().has(ListBuffer::List1, ListState::Ready));

        lists.execute(ListBuffer::List1).unwrap();
        assert_eq!(lists.observe(), ListStatus::LIST1_BUSY);
        assert_eq!(
            lists.observe(),
            ListStatus::LIST1_BUSY | ListStatus::LIST1_USED
        );
        assert_eq!(lists.observe(), ListStatus::LIST1_USED);
    }

    #[test]
    fn test_load_while_other_executes() {
        let mut lists = ListModel::new(5);
        lists.start(ListBuffer::List1, 0).unwrap();
        lists.end_load().unwrap();
        lists.execute(ListBuffer::List1).unwrap();

        assert!(lists.start(ListBuffer::List2, 0).is_ok());
        assert_eq!(lists.start(ListBuffer::List1, 0), Err(ErrorMask::BUSY));
        assert_eq!(
            lists.status(),
            ListStatus::LIST1_BUSY | ListStatus::LIST2_LOAD
        );
    }

    #[test]
    fn test_execute_requires_ready() {
        let mut lists = ListModel::new(0);
        assert_eq!(lists.execute(ListBuffer::List2), Err(ErrorMask::IGNORED));
        assert_eq!(lists.end_load(), Err(ErrorMask::IGNORED));
    }

    #[test]
    fn test_reload_clears_used() {
        let mut lists = ListModel::new(0);
        lists.start(ListBuffer::List1, 0).unwrap();
        lists.end_load().unwrap();
        lists.execute(ListBuffer::List1).unwrap();
        lists.observe();
        assert!(lists.status().has(ListBuffer::List1, ListState::Used));

        lists.start(ListBuffer::List1, 0).unwrap();
        assert_eq!(lists.status(), ListStatus::LIST1_LOAD);
    }
}
