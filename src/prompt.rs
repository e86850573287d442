use std::io::{self, BufRead, Write};

use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::product::Product;

pub const PASSWORD_ENV: &str = "MINIBIZ_PASSWORD";

/// Resolves command inputs: an explicit flag wins, then (for passwords) the
/// environment, then an interactive prompt. Without a terminal a missing
/// value is a configuration error.
pub struct Prompter<R, W> {
    reader: R,
    writer: W,
    interactive: bool,
    hide_secrets: bool,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompts on the process terminal when stdin is a TTY.
    pub fn stdio() -> Self {
        Prompter {
            reader: io::stdin().lock(),
            writer: io::stdout(),
            interactive: atty::is(atty::Stream::Stdin),
            hide_secrets: true,
        }
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Secrets are read as plain lines from `reader`.
    pub fn new(reader: R, writer: W, interactive: bool) -> Self {
        Prompter { reader, writer, interactive, hide_secrets: false }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn text(&mut self, label: &str, value: Option<String>) -> Result<String> {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            return Ok(v.trim().to_string());
        }
        self.require_terminal(label)?;
        loop {
            let line = self.ask(label)?;
            if !line.is_empty() {
                return Ok(line);
            }
        }
    }

    pub fn password(&mut self, label: &str, value: Option<String>) -> Result<Zeroizing<String>> {
        self.secret(label, value, Some(PASSWORD_ENV))
    }

    /// Like [`Prompter::password`] without the environment fallback, for
    /// per-identity secrets.
    pub fn secret(
        &mut self,
        label: &str,
        value: Option<String>,
        env: Option<&str>,
    ) -> Result<Zeroizing<String>> {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            return Ok(Zeroizing::new(v));
        }
        if let Some(v) = env.and_then(|name| std::env::var(name).ok()).filter(|v| !v.is_empty()) {
            return Ok(Zeroizing::new(v));
        }
        self.require_terminal(label)?;
        let prompt = format!("{label}: ");
        let secret = if self.hide_secrets {
            rpassword::prompt_password(&prompt)?
        } else {
            self.writer.write_all(prompt.as_bytes())?;
            self.writer.flush()?;
            self.read_line()?
        };
        if secret.is_empty() {
            return Err(Error::Validation(format!("{label} must not be empty")));
        }
        Ok(Zeroizing::new(secret))
    }

    /// Yes/no question. Non-interactive runs take `default`.
    pub fn confirm(&mut self, label: &str, default: bool) -> Result<bool> {
        if !self.interactive {
            return Ok(default);
        }
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = self.ask(&format!("{label} {hint}"))?;
        Ok(match answer.to_ascii_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }

    /// Asks for products one at a time until the user declines another.
    pub fn products(&mut self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = Vec::new();
        loop {
            let n = products.len() + 1;
            let name = self.text(&format!("Enter a product name for the product #{n}"), None)?;
            let sku = self.text(&format!("Enter a product SKU (i.e. a unique identifier) for the product #{n}"), None)?;
            let price = self.text(&format!("Enter a price in USD for the product #{n}"), None)?;
            let count = self.text(&format!("How many items of the product #{n} do you have in stock?"), None)?;
            let product = Product::from_fields(&sku, &name, &count, &price)?;
            if products.iter().any(|p| p.sku == product.sku) {
                return Err(Error::Validation(format!("product '{}' was already entered", product.sku)));
            }
            products.push(product);
            if !self.confirm("Do you want to setup another product?", false)? {
                return Ok(products);
            }
        }
    }

    fn require_terminal(&self, label: &str) -> Result<()> {
        if self.interactive {
            Ok(())
        } else {
            Err(Error::Configuration(format!("{label} is required in non-interactive mode")))
        }
    }

    fn ask(&mut self, label: &str) -> Result<String> {
        write!(self.writer, "{label}: ")?;
        self.writer.flush()?;
        Ok(self.read_line()?.trim().to_string())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(Error::Configuration("input closed before a value was given".into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
