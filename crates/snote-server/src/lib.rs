//! HTTP server for snote.
//!
//! Thin axum glue over the note and blob stores, the render service, and the
//! garbage collection scheduler.
//!
//! | Route                           | Method          | Purpose                          |
//! |---------------------------------|-----------------|----------------------------------|
//! | `/`                             | GET             | redirect to `/ls`                |
//! | `/:note_id`                     | GET             | rendered note (or `ls`, `lstag`) |
//! | `/api/note`                     | POST            | create empty note (`suggested_id`) |
//! | `/api/note/:note_id`            | GET, PUT, DELETE| note JSON                        |
//! | `/api/blob`                     | POST            | multipart upload                 |
//! | `/api/blob/:blob_id/:filename`  | GET             | stream a blob                    |
//! | `/api/blob/:blob_id`            | GET             | stream a blob, no filename       |
//! | `/api/gc`                       | POST            | trigger a collection pass        |
//! | `/api/health`                   | GET             | liveness and GC status           |

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{GcConfig, RenderConfig, SnoteConfig};
pub use error::{ServerError, ServerResult};
pub use server::SnoteServer;
pub use state::AppState;
