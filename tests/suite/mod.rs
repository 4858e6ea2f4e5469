mod chunked_loading;
mod pool;
