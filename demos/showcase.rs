//! Showcase of html-unmarshal decoding and error reporting
//!
//! Run with: cargo run --example showcase

use facet::Facet;
use html_unmarshal::{BoxError, ElementRef, Selection, UnmarshalHtml, Unmarshaler};
use html_unmarshal as html;

const LISTING: &str = r#"<!DOCTYPE html>
<html>
  <body>
    <h1 class="shop">Corner Books</h1>
    <ul id="books">
      <li class="book" data-sku="b-001">
        <span class="title">The Left Hand of Darkness</span>
        <span class="price">8.99</span>
        <span class="stock">true</span>
        <a class="details" href="/books/b-001">details</a>
      </li>
      <li class="book" data-sku="b-002">
        <span class="title">Kindred</span>
        <span class="price">11.50</span>
        <span class="stock">false</span>
        <a class="details" href="/books/b-002">details</a>
      </li>
    </ul>
    <footer><a href="/about">about</a> <a href="/contact">contact</a></footer>
  </body>
</html>
"#;

#[derive(Facet, Default, Debug)]
struct Shop {
    #[facet(html::selector = ".shop")]
    name: String,
    #[facet(html::selector = "#books .book")]
    books: Vec<Book>,
    #[facet(html::selector = "footer")]
    footer: FooterLinks,
}

#[derive(Facet, Default, Debug)]
struct Book {
    #[facet(html::selector = "@[data-sku]")]
    sku: String,
    #[facet(html::selector = ".title")]
    title: String,
    #[facet(html::selector = ".price")]
    price: f32,
    #[facet(html::selector = ".stock")]
    in_stock: bool,
    #[facet(html::selector = ".details @[href]")]
    url: String,
}

#[derive(Facet, Default, Debug)]
#[facet(html::custom)]
struct FooterLinks(Vec<Link>);

#[derive(Facet, Default, Debug)]
struct Link {
    text: String,
    href: String,
}

impl UnmarshalHtml for FooterLinks {
    fn unmarshal_html(&mut self, nodes: &[ElementRef<'_>]) -> Result<(), BoxError> {
        let links = Selection::from_nodes(nodes.iter().copied()).find("a");
        self.0 = links
            .iter()
            .map(|link| Link {
                text: link.text(),
                href: link.attr("href").unwrap_or_default().to_owned(),
            })
            .collect();
        Ok(())
    }
}

fn main() {
    println!("\n{}", "═".repeat(70));
    println!("  html-unmarshal Showcase");
    println!("{}\n", "═".repeat(70));

    let unmarshaler = Unmarshaler::new().with_custom::<FooterLinks>();

    println!("── Decoding a listing ──\n");
    match unmarshaler.from_str::<Shop>(LISTING) {
        Ok(shop) => {
            println!("{shop:#?}\n");
        }
        Err(err) => println!("unexpected error: {err}\n"),
    }

    println!("── A fixed array that does not match ──\n");
    #[derive(Facet, Default, Debug)]
    struct ThreeBooks {
        #[facet(html::selector = "#books .book")]
        books: [Book; 3],
    }
    if let Err(err) = html_unmarshal::from_str::<ThreeBooks>(LISTING) {
        print_chain(&err);
    }

    println!("── A price that is not a number ──\n");
    #[derive(Facet, Default, Debug)]
    struct Prices {
        #[facet(html::selector = "#books .title")]
        prices: Vec<f32>,
    }
    if let Err(err) = html_unmarshal::from_str::<Prices>(LISTING) {
        print_chain(&err);
    }
}

fn print_chain(err: &html_unmarshal::HtmlError) {
    let Some(err) = err.as_unmarshal() else {
        println!("{err}\n");
        return;
    };

    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    let mut depth = 0;
    while let Some(level) = current {
        println!("  {:indent$}{level}", "", indent = depth * 2);
        current = level.source();
        depth += 1;
    }
    println!();
}
