use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, Status},
    Request, Response, Route,
};

use crate::Config;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Authorization, Content-Type";

/// Adds the cross-origin headers the browser front end needs to every response.
pub struct CorsFairing;

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let origin = req
            .rocket()
            .state::<Config>()
            .map(|config| config.allowed_origin())
            .unwrap_or("*");
        res.set_header(Header::new(
            "Access-Control-Allow-Origin",
            origin.to_string(),
        ));
        res.set_header(Header::new("Access-Control-Allow-Methods", ALLOWED_METHODS));
        res.set_header(Header::new("Access-Control-Allow-Headers", ALLOWED_HEADERS));
        if origin != "*" {
            res.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
        }
    }
}

pub fn routes() -> Vec<Route> {
    routes![preflight]
}

/// Answer any preflight request; the fairing supplies the headers.
#[options("/<_..>")]
fn preflight() -> Status {
    Status::NoContent
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use super::*;

    #[backend_test]
    async fn preflight_has_headers(client: Client) {
        let response = client.options("/election/create").dispatch().await;
        assert_eq!(Status::NoContent, response.status());

        let config = client.rocket().state::<Config>().unwrap();
        let headers = response.headers();
        assert_eq!(
            headers.get_one("Access-Control-Allow-Origin"),
            Some(config.allowed_origin())
        );
        assert_eq!(
            headers.get_one("Access-Control-Allow-Methods"),
            Some(ALLOWED_METHODS)
        );
    }
}
