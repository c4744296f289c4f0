pub mod supported_versions;
