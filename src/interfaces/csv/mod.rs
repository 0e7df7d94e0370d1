pub mod catalog_reader;
