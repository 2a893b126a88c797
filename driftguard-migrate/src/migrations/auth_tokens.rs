//! Session / API tokens

use driftguard::migration::Migration;

pub fn migrations() -> Vec<Migration> {
    vec![Migration::new(
        20240203101000,
        "create_auth_tokens",
        r#"
CREATE TABLE auth_tokens (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    token_hash CHAR(64) NOT NULL UNIQUE,
    user_agent TEXT,
    expires_at TIMESTAMPTZ NOT NULL,
    revoked_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX idx_auth_tokens_user_id ON auth_tokens (user_id);
-- the cleanup job deletes by expiry
CREATE INDEX idx_auth_tokens_expires_at ON auth_tokens (expires_at);
"#,
        r#"
DROP INDEX IF EXISTS idx_auth_tokens_expires_at;
DROP INDEX IF EXISTS idx_auth_tokens_user_id;
DROP TABLE auth_tokens;
"#,
    )]
}
