//! End-to-end harvest tests against mock HTTP servers

mod crawl_tests;
