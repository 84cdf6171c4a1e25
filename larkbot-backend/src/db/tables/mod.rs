mod context;
mod kv_cache;
mod memories;
