//! Authorization guard.
//!
//! Reads are open to everyone. Mutations are allowed only to the owner:
//! the author of a quiz or question, or the user of an attempt. Answers
//! and question attempts are guarded through their owning question and
//! attempt respectively.

use crate::error::QuizError;
use crate::model::{Question, Quiz, QuizAttempt, UserId};

/// An entity with a single owning user.
pub trait Owned {
    /// The user allowed to mutate this entity.
    fn owner(&self) -> &UserId;

    /// Entity name used in `Forbidden` errors.
    fn entity_name(&self) -> &'static str;
}

impl Owned for Quiz {
    fn owner(&self) -> &UserId {
        &self.author
    }

    fn entity_name(&self) -> &'static str {
        "quiz"
    }
}

impl Owned for Question {
    fn owner(&self) -> &UserId {
        &self.author
    }

    fn entity_name(&self) -> &'static str {
        "question"
    }
}

impl Owned for QuizAttempt {
    fn owner(&self) -> &UserId {
        &self.user
    }

    fn entity_name(&self) -> &'static str {
        "quiz attempt"
    }
}

/// Open read policy.
pub fn can_read<T: Owned + ?Sized>(_actor: Option<&UserId>, _entity: &T) -> bool {
    true
}

pub fn can_mutate<T: Owned + ?Sized>(actor: &UserId, entity: &T) -> bool {
    actor == entity.owner()
}

/// Fail with `Forbidden` unless `actor` owns `entity`.
pub fn ensure_can_mutate<T: Owned + ?Sized>(actor: &UserId, entity: &T) -> Result<(), QuizError> {
    if can_mutate(actor, entity) {
        return Ok(());
    }
    tracing::warn!(
        actor = %actor,
        owner = %entity.owner(),
        entity = entity.entity_name(),
        "mutation rejected"
    );
    Err(QuizError::Forbidden {
        actor: actor.to_string(),
        entity: entity.entity_name(),
    })
}
