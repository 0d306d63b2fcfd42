use domtree::Package;

fn main() {
    let _node = {
        let package = Package::new();
        let doc = package.as_document();

        doc.create_element("hello")
    };
}
