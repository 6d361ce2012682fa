//! Consultation composition and decomposition.
//!
//! [`compose`] turns submitted form fields, the highlight scope and uploaded attachments into
//! a [`ConsultationPayload`](crate::record::ConsultationPayload). [`decompose`] turns a stored
//! record back into a [`ConsultationView`] for display.

mod compose;
mod decompose;
mod form;

pub use compose::compose;
pub use decompose::{
    decompose, ActionView, AttachmentView, ConsultationView, LabDateBanner, LabRow, LabSection,
};
pub use form::{parse_date, parse_decimal, FormData};
