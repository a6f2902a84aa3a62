#![allow(missing_docs)]

pub mod answers;
pub mod answers_schema;
pub mod evaluate;
pub mod resolve;
pub mod session;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod value;

pub use answers::{AnswerSet, Meta, ValidationError, ValidationErrorKind, ValidationResult};
pub use answers_schema::generate as answers_schema;
pub use evaluate::{compare, effective_answer, evaluate};
pub use resolve::{ConditionDiagnostic, DerivedState, DerivedStateMap, InertReason, resolve};
pub use session::{FillSession, SessionError, SubmissionTransport, SubmitError, TransportError};
pub use spec::{
    ConditionAction, ConditionOperator, FieldType, Form, FormCondition, FormQuestion, FormSection,
    TargetKind,
};
pub use submission::{
    FormAnswer, FormSubmission, SubmissionPayload, SubmissionRejected, SubmissionStatus, assemble,
};
pub use validate::{validate, validate_field};
pub use value::AnswerValue;
