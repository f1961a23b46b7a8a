//! Admin area.
//!
//! Routes are relative and nested under `/api/admin`; every handler requires
//! the `admin` role.
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/users` | Paginated users, `search` on email/name |
//! | GET/PATCH/DELETE | `/users/{id}` | Inspect, edit or remove an account |
//! | GET | `/documents` | Every active document |
//! | DELETE | `/documents/{id}` | Remove any document |
//! | GET/POST | `/topics` | List or create topics |
//! | PATCH/DELETE | `/topics/{slug}` | Edit or delete a topic |
//! | GET | `/reports` | Reports, filtered by status |
//! | PATCH | `/reports/{id}` | Change status or admin note |
//! | PUT | `/metadata/{key}` | Upsert a metadata entry |
//! | GET | `/stats` | Dashboard totals |

pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;

pub use handlers::AdminState;
pub use services::AdminService;
