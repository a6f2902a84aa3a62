pub mod condition;
pub mod form;
pub mod question;
pub mod section;

pub use condition::{
    ConditionAction, ConditionOperator, ConditionalLogic, FormCondition, TargetKind,
};
pub use form::{Form, FormSettings};
pub use question::{FieldType, FormQuestion, QuestionOption, QuestionSettings, ValidationRules};
pub use section::{FormSection, SectionSettings};
