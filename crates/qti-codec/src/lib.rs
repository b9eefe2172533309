// Copyright 2025 OctoQTI Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Binary snapshot codec for QTI test sessions
//!
//! A deterministic, versioned serialization of a test session to an octet
//! stream, and its reconstruction against the shared assessment tree. The
//! stream refers to model components by `(class, index)` through a
//! [`Seeker`] derived from the tree; the storage backend behind the
//! [`SessionStorage`] seam keeps streams per session identifier.

pub mod codec;
pub mod error;
pub mod seeker;
pub mod storage;
pub mod stream;

pub use codec::{SessionCodec, SessionCollaborators, FORMAT_VERSION};
pub use error::{CodecError, Result};
pub use seeker::Seeker;
pub use storage::{InMemorySessionStorage, SessionStorage};
pub use stream::{StreamReader, StreamWriter};
