//! Users, leads and the shared `updated_at` trigger

use driftguard::migration::Migration;

pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            20240105090000,
            "create_users",
            r#"
CREATE TABLE users (
    id BIGSERIAL PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    full_name VARCHAR(255),
    role VARCHAR(32) NOT NULL DEFAULT 'member',
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX idx_users_role ON users (role);
"#,
            r#"
DROP INDEX IF EXISTS idx_users_role;
DROP TABLE users;
"#,
        ),
        Migration::new(
            20240105091500,
            "create_leads",
            r#"
CREATE TABLE leads (
    id BIGSERIAL PRIMARY KEY,
    owner_id BIGINT REFERENCES users (id) ON DELETE SET NULL,
    email VARCHAR(255) NOT NULL,
    company VARCHAR(255),
    source VARCHAR(64) NOT NULL DEFAULT 'web_form',
    status VARCHAR(32) NOT NULL DEFAULT 'new',
    score INTEGER NOT NULL DEFAULT 0,
    message TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX idx_leads_email ON leads (email);
CREATE INDEX idx_leads_status_score ON leads (status, score DESC);
"#,
            r#"
DROP INDEX IF EXISTS idx_leads_status_score;
DROP INDEX IF EXISTS idx_leads_email;
DROP TABLE leads;
"#,
        ),
        Migration::new(
            20240112140000,
            "add_updated_at_triggers",
            r#"
CREATE OR REPLACE FUNCTION touch_updated_at() RETURNS trigger AS $$
BEGIN
    NEW.updated_at = NOW();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;
CREATE TRIGGER users_touch_updated_at BEFORE UPDATE ON users
    FOR EACH ROW EXECUTE FUNCTION touch_updated_at();
CREATE TRIGGER leads_touch_updated_at BEFORE UPDATE ON leads
    FOR EACH ROW EXECUTE FUNCTION touch_updated_at();
"#,
            r#"
DROP TRIGGER IF EXISTS leads_touch_updated_at ON leads;
DROP TRIGGER IF EXISTS users_touch_updated_at ON users;
DROP FUNCTION IF EXISTS touch_updated_at();
"#,
        ),
    ]
}
