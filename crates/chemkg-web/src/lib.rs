//! # ChemKG Query Service
//!
//! Read-only HTTP access to a built knowledge graph.
//!
//! ## Quick Start
//!
//! ```bash
//! chemkg build records.json
//! cargo run -p chemkg-web -- --graph .chemkg/graph.json --port 3000
//! ```
//!
//! ## API Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/api/trace?q=` | Prerequisite funnel for a concept or question |
//! | GET | `/api/concepts?min_count=10&limit=100` | Topics by mention count |
//! | GET | `/api/path?target=&known=a,b` | Learning path skipping known concepts |
//! | GET | `/api/health` | Liveness and node count |
//!
//! Unknown concepts answer 404 with suggestions. Every request is bounded
//! by a server-side timeout.

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
