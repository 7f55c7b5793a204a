//! GCP catalog: the closed sets every user-controlled field is checked against.

/// Compute Engine machine types accepted in a cart.
pub const INSTANCE_TYPES: &[&str] = &[
    "e2-micro",
    "e2-small",
    "e2-medium",
    "e2-standard-2",
    "e2-standard-4",
    "e2-highcpu-2",
    "e2-highmem-2",
    "n1-standard-1",
    "n2-standard-2",
    "n2-standard-4",
    "n2-standard-8",
    "c2-standard-4",
];

/// Cloud SQL tiers. `db-custom-2-3840` is the HA recommendation tier.
pub const DB_TIERS: &[&str] = &[
    "db-f1-micro",
    "db-g1-small",
    "db-custom-1-3840",
    "db-custom-2-3840",
    "db-custom-2-7680",
    "db-custom-4-15360",
];

pub const DB_VERSIONS: &[&str] = &[
    "POSTGRES_13",
    "POSTGRES_14",
    "POSTGRES_15",
    "MYSQL_8_0",
];

/// Cloud Storage classes. `MULTI_REGIONAL` is only emitted by the HA path.
pub const STORAGE_CLASSES: &[&str] = &[
    "STANDARD",
    "NEARLINE",
    "COLDLINE",
    "ARCHIVE",
    "MULTI_REGIONAL",
];

pub const MULTI_REGIONAL: &str = "MULTI_REGIONAL";

pub const DISK_TYPES: &[&str] = &["pd-standard", "pd-balanced", "pd-ssd"];

pub const REGIONS: &[&str] = &[
    "us-central1",
    "us-east4",
    "northamerica-northeast1",
    "europe-west1",
    "europe-west4",
    "europe-west9",
    "europe-north1",
    "europe-central2",
    "asia-east1",
];

pub const DEFAULT_INSTANCE: &str = "e2-medium";
pub const DEFAULT_DISK_TYPE: &str = "pd-balanced";
pub const DEFAULT_DISK_SIZE_GB: i64 = 50;
pub const DEFAULT_DB_TIER: &str = "db-f1-micro";
pub const DEFAULT_DB_VERSION: &str = "POSTGRES_14";
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";
pub const DEFAULT_REGION: &str = "europe-west1";
pub const DEFAULT_STACK: &str = "none";

pub const MIN_DISK_GB: i64 = 10;
pub const MAX_DISK_GB: i64 = 64_000;

/// Pre-installed software stacks and their boot scripts.
///
/// Scripts are authored here and never built from user input; the stack
/// name is the only thing a cart can choose.
const SOFTWARE_STACKS: &[(&str, &str)] = &[
    ("none", ""),
    (
        "web-nginx",
        r#"#!/bin/bash
set -euo pipefail
apt-get update -y
apt-get install -y nginx
systemctl enable --now nginx
"#,
    ),
    (
        "nodejs",
        r#"#!/bin/bash
set -euo pipefail
apt-get update -y
apt-get install -y ca-certificates curl
curl -fsSL https://deb.nodesource.com/setup_20.x | bash -
apt-get install -y nodejs
"#,
    ),
    (
        "python-django",
        r#"#!/bin/bash
set -euo pipefail
apt-get update -y
apt-get install -y python3 python3-venv python3-pip
python3 -m venv /opt/app
/opt/app/bin/pip install django gunicorn
"#,
    ),
    (
        "docker",
        r#"#!/bin/bash
set -euo pipefail
apt-get update -y
apt-get install -y docker.io
systemctl enable --now docker
"#,
    ),
];

/// Names of all known software stacks, including `none`.
pub fn stack_names() -> Vec<&'static str> {
    SOFTWARE_STACKS.iter().map(|(name, _)| *name).collect()
}

/// Startup script for a stack; `None` for unknown stacks.
pub fn startup_script(stack: &str) -> Option<&'static str> {
    SOFTWARE_STACKS
        .iter()
        .find(|(name, _)| *name == stack)
        .map(|(_, script)| *script)
}

/// Multi-region bucket location for a region (`EU`, `US` or `ASIA`).
pub fn multi_region_location(region: &str) -> &'static str {
    if region.starts_with("europe") {
        "EU"
    } else if region.starts_with("asia") {
        "ASIA"
    } else {
        "US"
    }
}
