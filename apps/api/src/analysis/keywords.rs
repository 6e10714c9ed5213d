//! Seed vocabulary for keyword scoring.
//!
//! Terms are lowercase and matched as plain substrings of the lowercased
//! resume, so "java" also matches inside "javascript". Swap this table to
//! retarget the scorer at a different job domain.

pub const KEYWORD_VOCABULARY: &[&str] = &[
    "javascript",
    "typescript",
    "react",
    "node",
    "python",
    "java",
    "sql",
    "aws",
    "docker",
    "kubernetes",
    "git",
    "api",
    "cloud",
    "testing",
    "agile",
    "scrum",
    "leadership",
    "management",
    "communication",
    "teamwork",
    "problem solving",
    "analytics",
    "data",
    "design",
    "development",
    "project",
    "experience",
    "skills",
];
