//! Typeforge Core
//!
//! This crate builds the description of a new type from a base type and a
//! sequence of member additions, with:
//! - Hierarchy walking with hiding and visibility rules
//! - An override ledger tracking which inherited slots are bound
//! - Dependency-ordered member-generation modules
//! - A definition aggregate that validates and seals before a backend runs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            ForgeContext                                 │
//! │  ┌───────────┐  ┌────────────────────┐  ┌─────────────┐                 │
//! │  │ Interner  │  │ TypeIntrospection  │  │ ForgeConfig │                 │
//! │  │ (names)   │  │ (base universe)    │  │             │                 │
//! │  └───────────┘  └────────────────────┘  └─────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//!         ↑                    ↑
//!    ┌────┴──────┐     ┌───────┴────────┐     ┌───────────┐     ┌─────────┐
//!    │  Modules  │  →  │ TypeDefinition │  →  │  Emitter  │  →  │ Builder │
//!    │ (resolve) │     │ walk + ledger  │     │ (bodies)  │     │ (slots) │
//!    └───────────┘     └────────────────┘     └───────────┘     └─────────┘
//! ```

// Core modules
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod ids;
pub mod index_vec;
pub mod interner;
pub mod known;
pub mod universe;

// Member model
pub mod member;
pub mod signature;
pub mod visibility;

// Resolution
pub mod definition;
pub mod hierarchy;
pub mod ledger;
pub mod modules;

// Collaborators and orchestration
pub mod backend;
pub mod session;

// Re-exports
pub use backend::{FinalizedType, InstructionEmitter, MemberBuilder};
pub use config::ForgeConfig;
pub use context::ForgeContext;
pub use definition::{TypeAttributes, TypeDefinition};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::{ForgeError, ForgeResult};
pub use hierarchy::{HierarchyWalker, InheritedMember, InheritedMembers};
pub use ids::{BodyHandle, MemberId, ModuleId, TypeId};
pub use index_vec::{Idx, IndexVec};
pub use interner::{Interner, Name};
pub use known::KnownTypes;
pub use ledger::{OverrideLedger, SlotState};
pub use member::{DeclaredMember, GeneratedMember, MemberKind, MemberShape};
pub use modules::{resolve_modules, MemberModule, ModuleGraph};
pub use session::{GenerationSession, Generated};
pub use signature::{MemberCategory, Signature};
pub use universe::{TypeFlavor, TypeInfo, TypeIntrospection, TypeUniverse};
pub use visibility::{effective_visibility, Visibility};
