use domtree::Package;

fn main() {
    let _doc = {
        let package = Package::new();
        package.as_document()
    };
}
