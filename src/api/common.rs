use mongodb::{
    bson::{doc, Bson},
    results::InsertOneResult,
};
use rocket::http::Status;

use crate::{
    error::{Error, Result},
    model::{
        db::election::Election,
        mongodb::{Coll, Id},
    },
};

/// Fetch an election, but only if `creator_id` owns it.
///
/// Elections owned by someone else are reported as missing.
pub async fn owned_election(
    elections: &Coll<Election>,
    election_id: Id,
    creator_id: Id,
) -> Result<Election> {
    let filter = doc! {
        "_id": election_id,
        "creator_id": creator_id,
    };
    elections
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
}

/// Fetch an election by ID.
pub async fn find_election(elections: &Coll<Election>, election_id: Id) -> Result<Election> {
    elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
}

/// The ID the database assigned to a freshly inserted document.
pub fn inserted_id(result: InsertOneResult) -> Result<Id> {
    object_id(&result.inserted_id)
}

pub fn object_id(key: &Bson) -> Result<Id> {
    key.as_object_id().map(Id::from).ok_or_else(|| {
        Error::Status(
            Status::InternalServerError,
            format!("Database assigned a non-ObjectId key: {key}"),
        )
    })
}

/// Request helpers shared by the endpoint tests.
#[cfg(test)]
pub mod test_helpers {
    use mongodb::{bson::doc, Database};
    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::{
        model::{
            api::{
                auth::{user::Voter, AuthToken, SigninRequest, SigninResponse, SignupRequest},
                candidate::{CandidateBatch, CandidateDescription, CandidateList, CandidateSpec},
                election::{ElectionCreated, ElectionDescription, ElectionSpec},
            },
            db::user::User,
            mongodb::Coll,
        },
        Config,
    };

    /// An `Authorization` header carrying the given token.
    pub fn bearer(token: &str) -> Header<'static> {
        Header::new("Authorization", format!("Bearer {token}"))
    }

    pub async fn signup(client: &Client, request: &SignupRequest) -> Status {
        client
            .post("/auth/signup")
            .header(ContentType::JSON)
            .body(serde_json::to_string(request).unwrap())
            .dispatch()
            .await
            .status()
    }

    /// Sign in and return the bearer token.
    pub async fn signin(client: &Client, email: &str, password: &str) -> String {
        let request = SigninRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = client
            .post("/auth/signin")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&request).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json::<SigninResponse>().await.unwrap().token
    }

    /// Create an account and return its `Authorization` header.
    ///
    /// The token is minted directly so the client's cookie jar, and with it
    /// whoever is signed in, stays untouched.
    pub async fn register(client: &Client, request: &SignupRequest) -> Header<'static> {
        assert_eq!(Status::Ok, signup(client, request).await);
        let db = client.rocket().state::<Database>().unwrap();
        let user = Coll::<User>::from_db(db)
            .find_one(doc! { "email": &request.email }, None)
            .await
            .unwrap()
            .unwrap();
        let config = client.rocket().state::<Config>().unwrap();
        bearer(&AuthToken::<Voter>::for_user(&user).encode(config).unwrap())
    }

    /// Create an election as the signed-in admin.
    pub async fn create_election(client: &Client) -> ElectionDescription {
        let response = client
            .post("/election/create")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&ElectionSpec::example()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response
            .into_json::<ElectionCreated>()
            .await
            .unwrap()
            .election
    }

    /// Add candidates with the given names as the signed-in admin.
    pub async fn add_candidates(
        client: &Client,
        election: &ElectionDescription,
        names: &[&str],
    ) -> Vec<CandidateDescription> {
        let batch = CandidateBatch {
            candidates: names
                .iter()
                .map(|name| CandidateSpec {
                    name: name.to_string(),
                    description: String::new(),
                })
                .collect(),
        };
        let response = client
            .post(format!("/candidate/addcandidates/{}", election.id))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&batch).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json::<CandidateList>().await.unwrap().candidates
    }

    /// Move an election to another status as the signed-in admin. `action` is `start`, `upcoming` or `complete`.
    pub async fn set_status(client: &Client, election: &ElectionDescription, action: &str) {
        let response = client
            .put(format!("/election/status/{action}/{}", election.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    /// An active election with the given candidates.
    pub async fn active_election(
        client: &Client,
        names: &[&str],
    ) -> (ElectionDescription, Vec<CandidateDescription>) {
        let election = create_election(client).await;
        let candidates = add_candidates(client, &election, names).await;
        set_status(client, &election, "start").await;
        (election, candidates)
    }
}
