//! Interactive shopping session.
//!
//! Reads one line at a time from stdin. A line that is not a command is
//! treated as a scanned or typed EAN and added to the cart of the current
//! store visit.
//!
//! ```text
//! > 4006381333931          add one of the product
//! > q 0 3                  set line 0 to 3 (sent after a short pause)
//! > rm 0                   remove line 0
//! > bins                   show the cart split into groups
//! > show | clear | stores | new <store> | load <visit> | help | quit
//! ```

use std::io::{self, Write};
use std::time::Instant;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, instrument, warn};

use grocery_aid_client::{
    ApiClient, LookupState, ProductPicker, QuantityInput, Resource, UserFacingError, VisitState,
};
use grocery_aid_core::{add_single_product, change_cart_product_quantity, remove_product};

use super::{write_grouped_cart, write_visit};

const HELP: &str = "\
Commands:
  <ean>           add a product by its EAN
  q <line> <n>    set the quantity of a cart line
  rm <line>       remove a cart line
  show            show the cart
  bins            show the cart split into groups
  stores          list stores
  new <store>     start a store visit
  load <visit>    continue a store visit
  clear           leave the current store visit
  quit            exit";

/// How the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Start {
    /// Start a new store visit in the given store.
    NewVisit(String),
    /// Continue the given store visit.
    Resume(String),
    /// No store visit until the user picks one.
    Empty,
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Nothing,
    Help,
    Quit,
    Show,
    Bins,
    Stores,
    Clear,
    New(String),
    Load(String),
    Quantity { index: usize, quantity: u32 },
    Remove { index: usize },
    Code(String),
}

/// Malformed command line.
#[derive(Debug, Error, PartialEq, Eq)]
enum InputError {
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Not a number: {0:?}")]
    InvalidNumber(String),
}

fn number<T: std::str::FromStr>(word: &str) -> Result<T, InputError> {
    word.parse()
        .map_err(|_| InputError::InvalidNumber(word.to_string()))
}

fn parse_command(line: &str) -> Result<Command, InputError> {
    let words: Vec<&str> = line.split_whitespace().collect();

    let command = match words.as_slice() {
        [] => Command::Nothing,
        ["help" | "?"] => Command::Help,
        ["quit" | "exit"] => Command::Quit,
        ["show"] => Command::Show,
        ["bins"] => Command::Bins,
        ["stores"] => Command::Stores,
        ["clear"] => Command::Clear,
        ["new", store] => Command::New((*store).to_string()),
        ["new", ..] => return Err(InputError::Usage("new <store>")),
        ["load", visit] => Command::Load((*visit).to_string()),
        ["load", ..] => return Err(InputError::Usage("load <visit>")),
        ["q", index, quantity] => Command::Quantity {
            index: number(index)?,
            quantity: number(quantity)?,
        },
        ["q", ..] => return Err(InputError::Usage("q <line> <quantity>")),
        ["rm", index] => Command::Remove {
            index: number(index)?,
        },
        ["rm", ..] => return Err(InputError::Usage("rm <line>")),
        _ => Command::Code(line.trim().to_string()),
    };
    Ok(command)
}

/// Run the session until `quit` or end of input.
///
/// # Errors
///
/// Returns an error if stdin or stdout fail, or if the store visit given in
/// `start` cannot be created or loaded.
#[instrument(skip(api))]
pub async fn run(api: &ApiClient, start: Start) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new(api.clone(), io::stdout());

    match start {
        Start::NewVisit(store) => {
            session.visit.create(api, &store).await?;
            session.sync_quantities();
            session.show()?;
        }
        Start::Resume(visit) => {
            session.visit.load(api, &visit).await?;
            session.sync_quantities();
            session.show()?;
        }
        Start::Empty => writeln!(
            session.out,
            "No store visit. Use `new <store>` or `load <visit>`, `help` for commands."
        )?,
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        session.prompt()?;

        let deadline = session.next_deadline();
        let sleep = tokio::time::sleep_until(
            deadline.map_or_else(tokio::time::Instant::now, tokio::time::Instant::from_std),
        );

        let event = tokio::select! {
            line = lines.next_line() => Event::Line(line?),
            () = sleep, if deadline.is_some() => Event::QuantityDue,
        };

        match event {
            Event::QuantityDue => session.send_due_quantities(Instant::now()).await?,
            Event::Line(None) => break,
            Event::Line(Some(line)) => match parse_command(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => session.handle(command).await?,
                Err(err) => writeln!(session.out, "{err}")?,
            },
        }
    }

    session.finish().await?;
    Ok(())
}

/// What woke the session loop.
enum Event {
    Line(Option<String>),
    QuantityDue,
}

/// State of the interactive session.
struct Session<W> {
    api: ApiClient,
    visit: VisitState,
    picker: ProductPicker,
    /// One input per cart line, in cart order.
    quantities: Vec<QuantityInput>,
    out: W,
}

impl<W: Write> Session<W> {
    fn new(api: ApiClient, out: W) -> Self {
        Self {
            api,
            visit: VisitState::new(),
            picker: ProductPicker::new(),
            quantities: Vec::new(),
            out,
        }
    }

    /// Leave the session without dropping quantity edits.
    async fn finish(&mut self) -> io::Result<()> {
        self.send_pending_quantities().await
    }

    fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.quantities
            .iter()
            .filter_map(QuantityInput::next_deadline)
            .min()
    }

    /// Line up the quantity inputs with the cart of the current snapshot.
    ///
    /// Lines whose server quantity changed drop their local edit.
    fn sync_quantities(&mut self) {
        let items = self
            .visit
            .current()
            .map(|visit| visit.cart.items.as_slice())
            .unwrap_or_default();

        self.quantities.truncate(items.len());
        for (index, item) in items.iter().enumerate() {
            match self.quantities.get_mut(index) {
                Some(input) if input.committed() != item.quantity => input.commit(item.quantity),
                Some(_) => {}
                None => self.quantities.push(QuantityInput::new(item.quantity)),
            }
        }
    }

    async fn handle(&mut self, command: Command) -> Result<(), Box<dyn std::error::Error>> {
        match command {
            Command::Nothing | Command::Quit => {}
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Show => self.show()?,
            Command::Bins => self.bins().await?,
            Command::Stores => self.stores().await?,
            Command::Clear => {
                self.send_pending_quantities().await?;
                self.visit.clear();
                self.picker = ProductPicker::new();
                self.sync_quantities();
                writeln!(self.out, "Store visit cleared")?;
            }
            Command::New(store) => {
                self.send_pending_quantities().await?;
                match self.visit.create(&self.api, &store).await.map(|_| ()) {
                    Ok(_) => {
                        self.sync_quantities();
                        self.show()?;
                    }
                    Err(err) => {
                        let err = UserFacingError::lookup(Resource::Store, &err);
                        writeln!(self.out, "{err}")?;
                    }
                }
            }
            Command::Load(visit) => {
                self.send_pending_quantities().await?;
                match self.visit.load(&self.api, &visit).await.map(|_| ()) {
                    Ok(_) => {
                        self.sync_quantities();
                        self.show()?;
                    }
                    Err(err) => {
                        let err = UserFacingError::lookup(Resource::StoreVisit, &err);
                        writeln!(self.out, "{err}")?;
                    }
                }
            }
            Command::Quantity { index, quantity } => self.edit_quantity(index, quantity)?,
            Command::Remove { index } => self.remove(index).await?,
            Command::Code(code) => self.scan(&code).await?,
        }
        Ok(())
    }

    fn show(&mut self) -> io::Result<()> {
        match self.visit.current() {
            Some(visit) => write_visit(&mut self.out, visit),
            None => writeln!(self.out, "No store visit"),
        }
    }

    async fn bins(&mut self) -> io::Result<()> {
        match self.visit.grouped_cart(&self.api).await {
            Ok(grouped) => write_grouped_cart(&mut self.out, &grouped),
            Err(err) => writeln!(self.out, "{}", UserFacingError::from(err)),
        }
    }

    async fn stores(&mut self) -> io::Result<()> {
        match self.api.get_stores().await {
            Ok(stores) => {
                for store in &stores {
                    writeln!(self.out, "{}  {}", store.id, store.name)?;
                }
                Ok(())
            }
            Err(err) => writeln!(self.out, "{}", UserFacingError::other(&err)),
        }
    }

    /// Look up a typed or scanned code and add it to the cart.
    async fn scan(&mut self, code: &str) -> io::Result<()> {
        self.picker.edit(code);
        if let Some(message) = self.picker.validation_error() {
            return writeln!(self.out, "{message}");
        }

        let Some(store) = self.visit.current().map(|visit| visit.store.clone()) else {
            return writeln!(self.out, "No store visit. Use `new <store>` or `load <visit>`.");
        };

        if let Some(ean) = self.picker.begin_lookup() {
            let result = self
                .api
                .get_product(&store, ean.as_str())
                .await
                .map_err(|err| UserFacingError::lookup(Resource::Product, &err).to_string());
            self.picker.lookup_finished(&ean, result);
        }

        match self.picker.lookup() {
            LookupState::Found(product) => {
                writeln!(self.out, "{}  {}", product.name, product.price)?;
            }
            LookupState::Failed(message) => return writeln!(self.out, "{message}"),
            LookupState::Idle | LookupState::Pending => {}
        }

        let Some(ean) = self.picker.begin_submit() else {
            return Ok(());
        };

        match self
            .visit
            .apply_patch(&self.api, &add_single_product(ean.as_str()))
            .await
            .map(|_| ())
        {
            Ok(_) => {
                self.picker.submit_finished(Ok(()));
                self.sync_quantities();
                self.show()
            }
            Err(err) => {
                let err = UserFacingError::mutation(&err);
                warn!(ean = %ean, error = %err, "Adding product failed");
                self.picker.submit_finished(Err(err.to_string()));
                writeln!(self.out, "{err} (input kept: {})", self.picker.raw().trim())
            }
        }
    }

    fn edit_quantity(&mut self, index: usize, quantity: u32) -> io::Result<()> {
        let Some(input) = self.quantities.get_mut(index) else {
            return writeln!(self.out, "No cart line {index}");
        };
        if input.committed().is_none() {
            return writeln!(self.out, "Line {index} is sold by price, not by quantity");
        }
        let quantity = input.edit(quantity, Instant::now());
        debug!(index, quantity, "Quantity edited");
        Ok(())
    }

    async fn remove(&mut self, index: usize) -> io::Result<()> {
        if index >= self.quantities.len() {
            return writeln!(self.out, "No cart line {index}");
        }
        // Pending quantity edits refer to the current line numbers
        self.send_pending_quantities().await?;

        match self
            .visit
            .apply_patch(&self.api, &remove_product(index))
            .await
            .map(|_| ())
        {
            Ok(_) => {
                self.sync_quantities();
                self.show()
            }
            Err(err) => writeln!(self.out, "{}", UserFacingError::mutation(&err)),
        }
    }

    /// Send every quantity whose window has passed at `now`.
    async fn send_due_quantities(&mut self, now: Instant) -> io::Result<()> {
        let due: Vec<(usize, u32)> = self
            .quantities
            .iter_mut()
            .enumerate()
            .filter_map(|(index, input)| input.poll(now).map(|quantity| (index, quantity)))
            .collect();

        for (index, quantity) in due {
            let patch = change_cart_product_quantity(index, quantity);
            let result = self
                .visit
                .apply_patch(&self.api, &patch)
                .await
                .map(|visit| visit.cart.items.get(index).map(|item| item.total_price));
            match result {
                Ok(total) => {
                    if let Some(total) = total {
                        write_cart_line_total(&mut self.out, index, quantity, &total)?;
                    }
                    self.sync_quantities();
                }
                Err(err) => {
                    writeln!(self.out, "{}", UserFacingError::mutation(&err))?;
                }
            }
        }
        Ok(())
    }

    /// Send edits still waiting for their window.
    async fn send_pending_quantities(&mut self) -> io::Result<()> {
        match self.next_latest_deadline() {
            Some(deadline) => self.send_due_quantities(deadline).await,
            None => Ok(()),
        }
    }

    fn next_latest_deadline(&self) -> Option<Instant> {
        self.quantities
            .iter()
            .filter_map(QuantityInput::next_deadline)
            .max()
    }
}

fn write_cart_line_total(
    out: &mut impl Write,
    index: usize,
    quantity: u32,
    total: &grocery_aid_core::Price,
) -> io::Result<()> {
    writeln!(out, "Line {index}: {quantity} = {total}")
}
