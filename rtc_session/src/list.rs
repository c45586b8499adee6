//! Dual-buffer list scheduling.
//!
//! The card executes commands from one of two list buffers while the other
//! is filled, so the next job can be queued without stalling the current
//! one. Each buffer moves through LOAD → READY → BUSY → USED, but the status
//! register is observed rather than asserted: during transitions a buffer
//! can show several states at once. [`ListScheduler::poll_statuses`] hands
//! back the full flag set and never collapses it to a single state.

use rtc_common::card::consts::{
    LIST_START_POSITION, MANUAL_PAGE_EXECUTE_LIST, MANUAL_PAGE_LOAD_LIST,
};
use rtc_common::card::error::RtcError;
use rtc_common::card::gateway::DeviceGateway;
use rtc_common::card::status::{ListStatus, decode_errors, decode_list_status, format_failure};
use rtc_common::card::types::ListBuffer;
use tracing::debug;

/// List handshake for an acquired card.
///
/// Obtained from [`ConnectionSession::lists`](crate::session::ConnectionSession::lists).
pub struct ListScheduler<'a, G: DeviceGateway> {
    gateway: &'a mut G,
    slot: u32,
}

impl<'a, G: DeviceGateway> ListScheduler<'a, G> {
    pub(crate) fn new(gateway: &'a mut G, slot: u32) -> Self {
        Self { gateway, slot }
    }

    /// Start filling `buffer` from its first position.
    ///
    /// # Errors
    /// `ListBusy` if the card does not acknowledge the same buffer, which
    /// usually means it is still loading or executing.
    pub fn begin_load(&mut self, buffer: ListBuffer) -> Result<(), RtcError> {
        let ack = self.gateway.start_list(buffer.number(), LIST_START_POSITION);
        if ack != buffer.number() {
            return Err(RtcError::ListBusy(format!(
                "{}: {} was not opened (acknowledged {}), it is probably still loading or executing",
                format_failure(
                    "load_list",
                    self.slot,
                    i64::from(ack),
                    Some(MANUAL_PAGE_LOAD_LIST)
                ),
                buffer,
                ack
            )));
        }
        debug!("{} open for loading", buffer);
        Ok(())
    }

    /// Close the buffer currently being loaded.
    pub fn end_load(&mut self) {
        self.gateway.set_end_of_list();
    }

    /// Start executing a closed buffer.
    ///
    /// # Errors
    /// `ListNotReady` if the card refuses, with the decoded error register.
    pub fn execute(&mut self, buffer: ListBuffer) -> Result<(), RtcError> {
        let code = self.gateway.execute_list(buffer.number());
        if code != 0 {
            let mask = decode_errors(self.gateway.read_error_register());
            return Err(RtcError::ListNotReady(format!(
                "{}: {} [{}]",
                format_failure(
                    "execute_list",
                    self.slot,
                    i64::from(code),
                    Some(MANUAL_PAGE_EXECUTE_LIST)
                ),
                buffer,
                mask.message()
            )));
        }
        debug!("{} executing", buffer);
        Ok(())
    }

    /// Read the list status register once.
    pub fn poll_statuses(&mut self) -> ListStatus {
        decode_list_status(self.gateway.read_list_status_register())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateways::simulation::{SimulatedCard, SimulationOptions};
    use crate::session::ConnectionSession;
    use rtc_common::card::types::ListState;
    use std::path::Path;

    fn connected(execution_polls: u32) -> (ConnectionSession<SimulatedCard>, crate::session::SessionHandle) {
        let mut session = ConnectionSession::new(SimulatedCard::with_options(SimulationOptions {
            execution_polls,
            ..SimulationOptions::default()
        }));
        let handle = session
            .connect("10.0.0.2", Path::new("program"), Path::new("correction.ct5"))
            .unwrap();
        (session, handle)
    }

    #[test]
    #[serial_test::serial]
    fn test_begin_load_starts_at_position_zero() {
        let (mut session, handle) = connected(0);
        let mut lists = session.lists(&handle).unwrap();
        lists.begin_load(ListBuffer::List2).unwrap();
        assert_eq!(lists.poll_statuses(), ListStatus::LIST2_LOAD);
        drop(lists);
        assert_eq!(session.gateway().lists().position(), LIST_START_POSITION);
    }

    #[test]
    #[serial_test::serial]
    fn test_second_begin_load_is_busy() {
        let (mut session, handle) = connected(0);
        let mut lists = session.lists(&handle).unwrap();
        lists.begin_load(ListBuffer::List1).unwrap();
        let err = lists.begin_load(ListBuffer::List1).unwrap_err();
        assert!(err.is_list_error());
        assert!(matches!(err, RtcError::ListBusy(ref msg) if msg.contains("list 1")));
    }

    #[test]
    #[serial_test::serial]
    fn test_execute_without_end_is_not_ready() {
        let (mut session, handle) = connected(0);
        let mut lists = session.lists(&handle).unwrap();
        lists.begin_load(ListBuffer::List1).unwrap();
        let err = lists.execute(ListBuffer::List1).unwrap_err();
        assert!(matches!(err, RtcError::ListNotReady(ref msg) if msg.contains("command ignored")));
    }

    #[test]
    #[serial_test::serial]
    fn test_alternating_buffers() {
        let (mut session, handle) = connected(2);
        let mut lists = session.lists(&handle).unwrap();

        lists.begin_load(ListBuffer::List1).unwrap();
        lists.end_load();
        lists.execute(ListBuffer::List1).unwrap();

        let status = lists.poll_statuses();
        assert_eq!(status.states_of(ListBuffer::List1), vec![ListState::Busy]);
        let next = status.free_buffer().unwrap();
        assert_eq!(next, ListBuffer::List2);
        lists.begin_load(next).unwrap();
        lists.end_load();

        // Poll until list 1 reports USED; the finishing read shows BUSY and USED.
        let mut saw_transition = false;
        for _ in 0..10 {
            let status = lists.poll_statuses();
            if status.has(ListBuffer::List1, ListState::Busy)
                && status.has(ListBuffer::List1, ListState::Used)
            {
                saw_transition = true;
            }
            if !status.has(ListBuffer::List1, ListState::Busy) {
                break;
            }
        }
        assert!(saw_transition);

        lists.execute(ListBuffer::List2).unwrap();
        let status = lists.poll_statuses();
        assert!(status.has(ListBuffer::List1, ListState::Used));
        assert!(status.has(ListBuffer::List2, ListState::Busy));
        assert_eq!(status.free_buffer(), Some(ListBuffer::List1));
    }
}
