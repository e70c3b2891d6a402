//! Collaborators outside the local store: a remote calendar service and
//! externally authenticated identities.

mod calendar;
mod identity;

pub use calendar::{
    fetch_remote_events, insert_remote_event, AccountHandle, CalendarService,
    GoogleCalendarClient, NewRemoteEvent, RemoteError, RemoteEvent, RemoteOutcome, TimeWindow,
    DEFAULT_API_BASE_URL,
};
pub use identity::ExternalIdentity;
