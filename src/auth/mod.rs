mod log_in;
mod middleware;
mod password;
mod profile;
mod register;
mod token;
pub(crate) mod user;

pub use log_in::{log_in, log_out};
pub use middleware::auth_guard;
pub use password::{PasswordHash, ValidatedPassword};
pub use profile::{get_me, get_preferences, put_preferences};
pub use register::{SessionState, register};
pub use token::{JwtKeys, decode_token, encode_token};
pub use user::{
    DEFAULT_CURRENCY, NewUser, PublicUser, UserID, create_user,
    create_user_table, get_user_by_id, get_user_by_identifier, normalize_email,
};
