pub mod http_enrichment_service;
