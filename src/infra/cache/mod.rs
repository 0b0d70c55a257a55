pub mod in_memory_context_store;
