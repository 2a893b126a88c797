//! Password reset requests

use driftguard::migration::Migration;

pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            20240219083000,
            "create_password_resets",
            r#"
CREATE TABLE password_resets (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    token_hash CHAR(64) NOT NULL UNIQUE,
    expires_at TIMESTAMPTZ NOT NULL,
    used_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX idx_password_resets_user_id ON password_resets (user_id);
"#,
            r#"
DROP INDEX IF EXISTS idx_password_resets_user_id;
DROP TABLE password_resets;
"#,
        ),
        Migration::new(
            20240302120000,
            "add_users_password_changed_at",
            "ALTER TABLE users ADD COLUMN password_changed_at TIMESTAMPTZ;",
            "ALTER TABLE users DROP COLUMN password_changed_at;",
        ),
    ]
}
