use domtree::__internal::StringPool;

fn main() {
    let _s = {
        let pool = StringPool::new();
        pool.intern("hello")
    };
}
