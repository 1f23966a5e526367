//! The closed action vocabulary exposed to client agents.
//!
//! Every action a client can issue is a variant of [`Action`]. Each action
//! carries a wire name, a semantic class (which drives parameter
//! normalization), a one-letter shortcut key for the human-input tool, and a
//! usage string. Translation to the engine-native action name happens in
//! [`Action::to_native`] and must run *after* parameter normalization, since
//! normalization dispatches on the abstract action's class.

use serde::{Deserialize, Serialize};

/// The semantic class of an action, used to pick the moveMagnitude rule and
/// the `amount` default during parameter normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    /// Actions that apply a physical force (throw, push, pull).
    Force,
    /// Actions that open or close a receptacle.
    ObjectMove,
    /// Agent locomotion actions.
    Move,
    /// Everything else (look, pickup, put, drop, pass).
    Other,
}

/// An abstract action a client agent can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    CloseObject,
    DropObject,
    MoveAhead,
    MoveBack,
    MoveLeft,
    MoveRight,
    OpenObject,
    Pass,
    PickupObject,
    PullObject,
    PushObject,
    PutObject,
    RotateLook,
    ThrowObject,
}

impl Action {
    /// Every action, in wire-name order.
    pub const ALL: [Action; 14] = [
        Action::CloseObject,
        Action::DropObject,
        Action::MoveAhead,
        Action::MoveBack,
        Action::MoveLeft,
        Action::MoveRight,
        Action::OpenObject,
        Action::Pass,
        Action::PickupObject,
        Action::PullObject,
        Action::PushObject,
        Action::PutObject,
        Action::RotateLook,
        Action::ThrowObject,
    ];

    /// The wire name clients use to issue this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CloseObject => "CloseObject",
            Action::DropObject => "DropObject",
            Action::MoveAhead => "MoveAhead",
            Action::MoveBack => "MoveBack",
            Action::MoveLeft => "MoveLeft",
            Action::MoveRight => "MoveRight",
            Action::OpenObject => "OpenObject",
            Action::Pass => "Pass",
            Action::PickupObject => "PickupObject",
            Action::PullObject => "PullObject",
            Action::PushObject => "PushObject",
            Action::PutObject => "PutObject",
            Action::RotateLook => "RotateLook",
            Action::ThrowObject => "ThrowObject",
        }
    }

    /// Parse an exact wire name into an action.
    pub fn parse(name: &str) -> Option<Action> {
        Action::ALL.iter().copied().find(|a| a.as_str() == name)
    }

    /// The full vocabulary as wire names.
    pub fn vocabulary() -> Vec<String> {
        Action::ALL.iter().map(|a| a.as_str().to_string()).collect()
    }

    /// The semantic class this action belongs to.
    pub fn class(&self) -> ActionClass {
        match self {
            Action::ThrowObject | Action::PushObject | Action::PullObject => ActionClass::Force,
            Action::CloseObject | Action::OpenObject => ActionClass::ObjectMove,
            Action::MoveAhead | Action::MoveBack | Action::MoveLeft | Action::MoveRight => {
                ActionClass::Move
            }
            _ => ActionClass::Other,
        }
    }

    /// Translate the abstract action into the engine-native action name.
    ///
    /// Identity for all but three actions. The engine's native open/close
    /// handlers have unreliable error checking, so the scene registers its own
    /// handlers for those; drop maps to the engine's hand-specific name.
    pub fn to_native(&self) -> &'static str {
        match self {
            Action::CloseObject => "StagehandCloseObject",
            Action::OpenObject => "StagehandOpenObject",
            Action::DropObject => "DropHandObject",
            other => other.as_str(),
        }
    }

    /// One-letter shortcut key used by the human-input tool.
    pub fn shortcut_key(&self) -> char {
        match self {
            Action::CloseObject => 'c',
            Action::DropObject => 'x',
            Action::MoveAhead => 'w',
            Action::MoveBack => 's',
            Action::MoveLeft => 'a',
            Action::MoveRight => 'd',
            Action::OpenObject => 'o',
            Action::Pass => 'z',
            Action::PickupObject => 'p',
            Action::PullObject => 'l',
            Action::PushObject => 'h',
            Action::PutObject => 'u',
            Action::RotateLook => 'r',
            Action::ThrowObject => 't',
        }
    }

    /// Look up an action by its shortcut key.
    pub fn from_shortcut(key: char) -> Option<Action> {
        Action::ALL.iter().copied().find(|a| a.shortcut_key() == key)
    }

    /// Usage string showing the parameters this action recognizes.
    pub fn usage(&self) -> &'static str {
        match self {
            Action::CloseObject => {
                "CloseObject, objectId=(string), amount=(float 0-1), objectDirectionX/Y/Z=(float)"
            }
            Action::DropObject => "DropObject, objectId=(string)",
            Action::MoveAhead => "MoveAhead, amount=(float 0-1)",
            Action::MoveBack => "MoveBack, amount=(float 0-1)",
            Action::MoveLeft => "MoveLeft, amount=(float 0-1)",
            Action::MoveRight => "MoveRight, amount=(float 0-1)",
            Action::OpenObject => {
                "OpenObject, objectId=(string), amount=(float 0-1), objectDirectionX/Y/Z=(float)"
            }
            Action::Pass => "Pass",
            Action::PickupObject => {
                "PickupObject, objectId=(string), objectDirectionX/Y/Z=(float)"
            }
            Action::PullObject => {
                "PullObject, objectId=(string), force=(float 0-1), objectDirectionX/Y/Z=(float)"
            }
            Action::PushObject => {
                "PushObject, objectId=(string), force=(float 0-1), objectDirectionX/Y/Z=(float)"
            }
            Action::PutObject => {
                "PutObject, objectId=(string), receptacleObjectId=(string), \
                 receptacleObjectDirectionX/Y/Z=(float)"
            }
            Action::RotateLook => "RotateLook, rotation=(float), horizon=(float -180-180)",
            Action::ThrowObject => {
                "ThrowObject, objectId=(string), force=(float 0-1), objectDirectionX/Y/Z=(float)"
            }
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
