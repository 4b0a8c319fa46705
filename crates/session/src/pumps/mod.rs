//! Background tasks owned by a [`SessionTransport`](crate::SessionTransport).

pub(crate) mod read;
pub(crate) mod write;
