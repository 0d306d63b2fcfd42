use std::thread;

use domtree::Package;

fn main() {
    let package = Package::with_root("hello");
    let root = package.as_document().root();

    thread::spawn(move || {
        let _root = root;
    });
}
